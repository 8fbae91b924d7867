// ==========================================
// 种子数据导入引擎 - 导入运行记录 Repository
// ==========================================
// 职责: imports 表读写（pending → completed/partial/failed）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::init_schema;
use crate::domain::{ImportMode, ImportRunRecord, ImportStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// ImportRunRepository Trait
// ==========================================
#[async_trait]
pub trait ImportRunRepository: Send + Sync {
    /// 插入运行记录（通常为 pending 状态）
    async fn insert_run(&self, record: ImportRunRecord) -> RepositoryResult<()>;

    /// 更新运行记录状态与摘要
    async fn finalize_run(
        &self,
        import_id: &str,
        status: ImportStatus,
        summary: serde_json::Value,
    ) -> RepositoryResult<()>;

    /// 按 ID 查询
    async fn get_run(&self, import_id: &str) -> RepositoryResult<Option<ImportRunRecord>>;

    /// 查询最近的运行记录
    ///
    /// # 参数
    /// - limit: 返回记录数限制
    async fn list_recent_runs(&self, limit: usize) -> RepositoryResult<Vec<ImportRunRecord>>;
}

// ==========================================
// SqliteImportRunRepository
// ==========================================
pub struct SqliteImportRunRepository {
    conn: Arc<Mutex<Connection>>,
}

type RawRunRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
);

impl SqliteImportRunRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn into_record(raw: RawRunRow) -> RepositoryResult<ImportRunRecord> {
        let (import_id, collection_slug, mode, match_field, status, summary, created_at, updated_at) =
            raw;

        let parse_ts = |s: &str| -> RepositoryResult<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| RepositoryError::FieldValueError {
                    field: "created_at/updated_at".to_string(),
                    message: e.to_string(),
                })
        };

        Ok(ImportRunRecord {
            import_id,
            collection_slug,
            import_mode: mode
                .as_deref()
                .and_then(ImportMode::from_str)
                .unwrap_or(ImportMode::Upsert),
            match_field: match_field.unwrap_or_default(),
            status: status
                .as_deref()
                .map(ImportStatus::from_str)
                .unwrap_or(ImportStatus::Pending),
            summary: summary
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            created_at: parse_ts(&created_at)?,
            updated_at: parse_ts(&updated_at)?,
        })
    }
}

const RUN_COLUMNS: &str =
    "import_id, collection_slug, import_mode, match_field, status, summary, created_at, updated_at";

fn read_run_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRunRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

#[async_trait]
impl ImportRunRepository for SqliteImportRunRepository {
    async fn insert_run(&self, record: ImportRunRecord) -> RepositoryResult<()> {
        let summary = record
            .summary
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO imports ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                RUN_COLUMNS
            ),
            params![
                record.import_id,
                record.collection_slug,
                record.import_mode.to_db_str(),
                record.match_field,
                record.status.to_db_str(),
                summary,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn finalize_run(
        &self,
        import_id: &str,
        status: ImportStatus,
        summary: serde_json::Value,
    ) -> RepositoryResult<()> {
        let body = serde_json::to_string(&summary)?;
        let conn = self.lock()?;
        let affected = conn.execute(
            "UPDATE imports SET status = ?1, summary = ?2, updated_at = ?3 WHERE import_id = ?4",
            params![status.to_db_str(), body, Utc::now().to_rfc3339(), import_id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "imports".to_string(),
                id: import_id.to_string(),
            });
        }
        Ok(())
    }

    async fn get_run(&self, import_id: &str) -> RepositoryResult<Option<ImportRunRecord>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM imports WHERE import_id = ?1", RUN_COLUMNS),
                [import_id],
                read_run_row,
            )
            .optional()?;
        raw.map(Self::into_record).transpose()
    }

    async fn list_recent_runs(&self, limit: usize) -> RepositoryResult<Vec<ImportRunRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM imports ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;
        let rows = stmt.query_map([limit as i64], read_run_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::into_record(row?)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup_repo() -> SqliteImportRunRepository {
        let conn = Connection::open_in_memory().unwrap();
        SqliteImportRunRepository::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    fn pending(import_id: &str) -> ImportRunRecord {
        ImportRunRecord {
            import_id: import_id.to_string(),
            collection_slug: "clinics".to_string(),
            import_mode: ImportMode::Upsert,
            match_field: "stableId".to_string(),
            status: ImportStatus::Pending,
            summary: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_finalize_run() {
        let repo = setup_repo();
        repo.insert_run(pending("imp-1")).await.unwrap();

        repo.finalize_run(
            "imp-1",
            ImportStatus::Partial,
            json!({"created": 2, "failures": ["Failed clinics:c-3: boom"]}),
        )
        .await
        .unwrap();

        let run = repo.get_run("imp-1").await.unwrap().unwrap();
        assert_eq!(run.status, ImportStatus::Partial);
        assert_eq!(run.import_mode, ImportMode::Upsert);
        assert_eq!(run.summary.unwrap()["created"], json!(2));
    }

    #[tokio::test]
    async fn test_finalize_unknown_run_is_not_found() {
        let repo = setup_repo();
        let err = repo
            .finalize_run("missing", ImportStatus::Completed, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_recent_runs_limit() {
        let repo = setup_repo();
        for i in 0..3 {
            repo.insert_run(pending(&format!("imp-{}", i))).await.unwrap();
        }
        assert_eq!(repo.list_recent_runs(2).await.unwrap().len(), 2);
    }
}
