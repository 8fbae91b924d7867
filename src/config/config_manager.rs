// ==========================================
// 种子数据导入引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::seed_config_trait::SeedConfigReader;
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::ImportMode;
use crate::repository::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "SEED_IMPORTER_DB_PATH";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// 读取配置值，不存在或为空时返回默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_config_value(key)?
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取全部 global 配置的快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl SeedConfigReader for ConfigManager {
    async fn get_seed_data_dir(&self) -> RepositoryResult<PathBuf> {
        let value = self.get_config_or_default(config_keys::SEED_DATA_DIR, "seed")?;
        Ok(PathBuf::from(value))
    }

    async fn get_environment(&self) -> RepositoryResult<String> {
        self.get_config_or_default(config_keys::APP_ENVIRONMENT, "development")
    }

    async fn get_import_mode(&self) -> RepositoryResult<ImportMode> {
        let value = self.get_config_or_default(config_keys::IMPORT_MODE, "upsert")?;
        Ok(ImportMode::from_str(&value).unwrap_or(ImportMode::Upsert))
    }

    async fn get_match_field(&self) -> RepositoryResult<String> {
        self.get_config_or_default(config_keys::IMPORT_MATCH_FIELD, "stableId")
    }

    async fn get_max_concurrent_batches(&self) -> RepositoryResult<usize> {
        let value = self.get_config_or_default(config_keys::IMPORT_MAX_CONCURRENT_BATCHES, "4")?;
        Ok(value.trim().parse::<usize>().ok().filter(|&n| n > 0).unwrap_or(4))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const SEED_DATA_DIR: &str = "seed.data_dir";
    pub const APP_ENVIRONMENT: &str = "app.environment";
    pub const IMPORT_MODE: &str = "import.mode";
    pub const IMPORT_MATCH_FIELD: &str = "import.match_field";
    pub const IMPORT_MAX_CONCURRENT_BATCHES: &str = "import.max_concurrent_batches";
}

/// 获取默认数据库路径
///
/// # 优先级
/// 1. 环境变量 SEED_IMPORTER_DB_PATH
/// 2. 用户本地数据目录 /seed-importer/seed_importer.db
/// 3. 当前目录 ./seed_importer.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    match dirs::data_local_dir() {
        Some(data_dir) => {
            let dir = data_dir.join("seed-importer");
            std::fs::create_dir_all(&dir).ok();
            dir.join("seed_importer.db").to_string_lossy().to_string()
        }
        None => "./seed_importer.db".to_string(),
    }
}
