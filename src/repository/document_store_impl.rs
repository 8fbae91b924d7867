// ==========================================
// 种子数据导入引擎 - 目标存储 Repository 实现
// ==========================================
// 职责: 基于 rusqlite 的文档存储（每集合 JSON 文档 + stableId 唯一约束）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::{LiveId, StoredDocument};
use crate::repository::document_store::DocumentStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "id, collection, stable_id, data, created_at, updated_at";

/// 从数据库行读出的原始列
type RawDocumentRow = (i64, String, Option<String>, String, String, String);

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawDocumentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn parse_timestamp(raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: "timestamp".to_string(),
            message: format!("{}: {}", raw, e),
        })
}

fn into_document(raw: RawDocumentRow) -> RepositoryResult<StoredDocument> {
    let (id, collection, stable_id, data, created_at, updated_at) = raw;
    let data: Map<String, Value> = serde_json::from_str(&data)?;
    Ok(StoredDocument {
        id: LiveId::Int(id),
        collection,
        stable_id,
        data,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// JSON 标量 → SQLite 绑定值（json_extract 返回值的比较语义）
fn json_to_sql(value: &Value) -> Option<SqlValue> {
    match value {
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real)),
        _ => None,
    }
}

// ==========================================
// SqliteDocumentStore
// ==========================================
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
    /// 每集合必填字段（模拟目标存储的校验拒绝）
    required_fields: HashMap<String, Vec<String>>,
}

impl SqliteDocumentStore {
    /// 创建新的 Store 实例（自动初始化 schema）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            required_fields: HashMap::new(),
        })
    }

    /// 从已有连接创建（与 ImportRunRepository / ConfigManager 共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            init_schema(&guard)?;
        }

        Ok(Self {
            conn,
            required_fields: HashMap::new(),
        })
    }

    /// 声明集合的必填字段
    pub fn with_required_fields(mut self, collection: &str, fields: &[&str]) -> Self {
        self.required_fields.insert(
            collection.to_string(),
            fields.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn validate(&self, collection: &str, data: &Map<String, Value>) -> RepositoryResult<()> {
        let Some(fields) = self.required_fields.get(collection) else {
            return Ok(());
        };

        let missing: Vec<&str> = fields
            .iter()
            .filter(|f| data.get(f.as_str()).map_or(true, Value::is_null))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RepositoryError::ValidationError(format!(
                "{} 缺少必填字段: {}",
                collection,
                missing.join(", ")
            )))
        }
    }

    fn query_one(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Option<StoredDocument>> {
        let raw = conn.query_row(sql, params, read_raw_row).optional()?;
        raw.map(into_document).transpose()
    }

    fn get_by_rowid(conn: &Connection, id: i64) -> RepositoryResult<StoredDocument> {
        let sql = format!("SELECT {} FROM documents WHERE id = ?1", SELECT_COLUMNS);
        Self::query_one(conn, &sql, &[&id])?.ok_or_else(|| RepositoryError::NotFound {
            entity: "documents".to_string(),
            id: id.to_string(),
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_by_stable_id(
        &self,
        collection: &str,
        stable_id: &str,
    ) -> RepositoryResult<Option<StoredDocument>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM documents WHERE collection = ?1 AND stable_id = ?2 LIMIT 1",
            SELECT_COLUMNS
        );
        Self::query_one(&conn, &sql, &[&collection, &stable_id])
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &LiveId,
    ) -> RepositoryResult<Option<StoredDocument>> {
        // 本存储只分配整数 ID，文本 ID 若可解析为整数也接受
        let rowid = match id {
            LiveId::Int(v) => *v,
            LiveId::Text(s) => match s.parse::<i64>() {
                Ok(v) => v,
                Err(_) => return Ok(None),
            },
        };

        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM documents WHERE collection = ?1 AND id = ?2",
            SELECT_COLUMNS
        );
        Self::query_one(&conn, &sql, &[&collection, &rowid])
    }

    async fn find_one_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> RepositoryResult<Option<StoredDocument>> {
        let Some(bound) = json_to_sql(value) else {
            return Ok(None);
        };
        let path = format!("$.{}", field);

        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM documents WHERE collection = ?1 AND json_extract(data, ?2) = ?3 \
             ORDER BY id LIMIT 1",
            SELECT_COLUMNS
        );
        Self::query_one(&conn, &sql, &[&collection, &path, &bound])
    }

    async fn create(
        &self,
        collection: &str,
        stable_id: &str,
        data: Map<String, Value>,
    ) -> RepositoryResult<StoredDocument> {
        self.validate(collection, &data)?;

        let now = Utc::now().to_rfc3339();
        let body = serde_json::to_string(&data)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (collection, stable_id, data, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![collection, stable_id, body, now],
        )?;
        let id = conn.last_insert_rowid();

        Self::get_by_rowid(&conn, id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &LiveId,
        data: Map<String, Value>,
    ) -> RepositoryResult<StoredDocument> {
        let existing = self
            .find_by_id(collection, id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: collection.to_string(),
                id: id.to_string(),
            })?;

        let mut merged = existing.data;
        for (key, value) in data {
            merged.insert(key, value);
        }
        self.validate(collection, &merged)?;

        let now = Utc::now().to_rfc3339();
        let body = serde_json::to_string(&merged)?;
        let rowid = match existing.id {
            LiveId::Int(v) => v,
            LiveId::Text(_) => {
                return Err(RepositoryError::InternalError(
                    "documents 表只使用整数主键".to_string(),
                ))
            }
        };

        let conn = self.lock()?;
        conn.execute(
            "UPDATE documents SET data = ?1, updated_at = ?2 WHERE id = ?3",
            params![body, now, rowid],
        )?;

        Self::get_by_rowid(&conn, rowid)
    }

    async fn delete_all(&self, collection: &str) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM documents WHERE collection = ?1", [collection])?;
        Ok(deleted)
    }

    async fn count(&self, collection: &str) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::NamedTempFile;

    fn setup_store() -> (NamedTempFile, SqliteDocumentStore) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = SqliteDocumentStore::new(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, store)
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_by_stable_id() {
        let (_tmp, store) = setup_store();

        let created = store
            .create("cities", "city-1", obj(json!({"name": "Istanbul"})))
            .await
            .unwrap();
        let found = store.find_by_stable_id("cities", "city-1").await.unwrap().unwrap();

        assert_eq!(found.id, created.id);
        assert_eq!(found.stable_id.as_deref(), Some("city-1"));
        assert_eq!(found.field("name"), Some(&json!("Istanbul")));

        // 不同集合互不可见
        assert!(store.find_by_stable_id("clinics", "city-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_stable_id_rejected() {
        let (_tmp, store) = setup_store();
        store.create("tags", "t-1", Map::new()).await.unwrap();

        let err = store.create("tags", "t-1", Map::new()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_update_merges_top_level_fields() {
        let (_tmp, store) = setup_store();
        let doc = store
            .create("clinics", "c-1", obj(json!({"name": "A", "address": {"city": 1}})))
            .await
            .unwrap();

        let updated = store
            .update("clinics", &doc.id, obj(json!({"name": "B"})))
            .await
            .unwrap();

        assert_eq!(updated.field("name"), Some(&json!("B")));
        assert_eq!(updated.field("address"), Some(&json!({"city": 1})));
    }

    #[tokio::test]
    async fn test_required_fields_validation() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = SqliteDocumentStore::new(temp_file.path().to_str().unwrap())
            .unwrap()
            .with_required_fields("doctors", &["clinic"]);

        let err = store
            .create("doctors", "d-1", obj(json!({"name": "Dr. A", "clinic": null})))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(_)));
        assert_eq!(store.count("doctors").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_one_by_field_and_delete_all() {
        let (_tmp, store) = setup_store();
        store
            .create("platformStaff", "ps-1", obj(json!({"user": 11})))
            .await
            .unwrap();
        let staff = store
            .create("platformStaff", "ps-2", obj(json!({"user": 12})))
            .await
            .unwrap();

        let found = store
            .find_one_by_field("platformStaff", "user", &json!(12))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, staff.id);

        assert_eq!(store.delete_all("platformStaff").await.unwrap(), 2);
        assert_eq!(store.count("platformStaff").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_by_text_id() {
        let (_tmp, store) = setup_store();
        let doc = store.create("tags", "t-1", Map::new()).await.unwrap();

        let text_id = LiveId::Text(doc.id.to_string());
        assert!(store.find_by_id("tags", &text_id).await.unwrap().is_some());
        assert!(store
            .find_by_id("tags", &LiveId::Text("not-a-number".to_string()))
            .await
            .unwrap()
            .is_none());
    }
}
