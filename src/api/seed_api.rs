// ==========================================
// 种子数据导入API
// ==========================================
// 职责: 操作触发面，封装计划执行、单批次导入、重置与运行记录查询
// 约束: 生产环境只允许 baseline 导入，禁止 demo 导入与重置
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, SeedConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::{ImportOutcome, ImportRunRecord, SeedKind, SeedRunSummary};
use crate::importer::{plan_for, FileSeedLoader, ImportError, ImportRequest, SeedPlanStep, SeedRunner};
use crate::repository::{
    ImportRunRepository, RepositoryError, SqliteDocumentStore, SqliteImportRunRepository,
};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 种子导入API
pub struct SeedApi {
    store: Arc<SqliteDocumentStore>,
    runs: Arc<SqliteImportRunRepository>,
    config: ConfigManager,
    last_run: Mutex<Option<SeedRunSummary>>,
}

impl SeedApi {
    /// 创建新的SeedApi实例（各组件共享同一连接）
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path).map_err(RepositoryError::from)?;
        init_schema(&conn).map_err(RepositoryError::from)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        Ok(Self {
            store: Arc::new(SqliteDocumentStore::from_connection(conn.clone())?),
            runs: Arc::new(SqliteImportRunRepository::from_connection(conn.clone())?),
            config: ConfigManager::from_connection(conn)?,
            last_run: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    pub fn store(&self) -> Arc<SqliteDocumentStore> {
        self.store.clone()
    }

    /// 按配置构建计划执行器
    ///
    /// # 参数
    /// - data_dir: 种子目录；None 时使用配置 seed.data_dir
    async fn runner(
        &self,
        data_dir: Option<PathBuf>,
    ) -> ApiResult<SeedRunner<SqliteDocumentStore, FileSeedLoader>> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => self.config.get_seed_data_dir().await?,
        };
        let mode = self.config.get_import_mode().await?;
        let match_field = self.config.get_match_field().await?;
        let max_concurrent = self.config.get_max_concurrent_batches().await?;

        Ok(SeedRunner::new(self.store.clone(), FileSeedLoader::new(data_dir))
            .with_run_repository(self.runs.clone())
            .with_import_settings(mode, match_field)
            .with_max_concurrent_batches(max_concurrent))
    }

    /// 生产环境检查
    async fn ensure_allowed(&self, kind: SeedKind, reset: bool) -> ApiResult<()> {
        if !self.config.is_production().await? {
            return Ok(());
        }
        if kind == SeedKind::Demo {
            return Err(ImportError::DisabledInProduction("demo 种子导入".to_string()).into());
        }
        if reset {
            return Err(ImportError::DisabledInProduction("种子数据重置".to_string()).into());
        }
        Ok(())
    }

    /// 执行内置种子计划
    ///
    /// # 参数
    /// - kind: baseline / demo
    /// - reset: 是否先清空该类型集合
    /// - data_dir: 覆盖配置中的种子目录
    ///
    /// # 返回
    /// - Ok(SeedRunSummary): 运行摘要（同时保存为最近一次运行）
    /// - Err(ApiError::Forbidden): 生产环境禁止的操作
    pub async fn run_seed(
        &self,
        kind: SeedKind,
        reset: bool,
        data_dir: Option<PathBuf>,
    ) -> ApiResult<SeedRunSummary> {
        self.ensure_allowed(kind, reset).await?;

        let runner = self.runner(data_dir).await?;
        let summary = runner.run_plan(kind, &plan_for(kind), reset).await?;

        if !summary.partial_failures.is_empty() {
            warn!(
                partial_failures = ?summary.partial_failures,
                created = summary.totals.created,
                updated = summary.totals.updated,
                "种子计划部分失败"
            );
        }

        match self.last_run.lock() {
            Ok(mut last) => *last = Some(summary.clone()),
            Err(e) => warn!(error = %e, "最近运行摘要保存失败"),
        }
        Ok(summary)
    }

    /// 导入单个批次（登记运行记录）
    pub async fn import_collection(
        &self,
        request: ImportRequest,
        data_dir: Option<PathBuf>,
    ) -> ApiResult<ImportOutcome> {
        if request.collection.trim().is_empty() || request.file_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("collection 与 file_name 不能为空".to_string()));
        }
        self.ensure_allowed(request.kind, false).await?;

        let step = SeedPlanStep::new(&request.collection, &request.collection, &request.file_name)
            .with_mapping(request.mapping);
        let runner = self.runner(data_dir).await?;
        Ok(runner.run_step(request.kind, &step).await?)
    }

    /// 清空某类型的种子集合
    pub async fn reset(&self, kind: SeedKind) -> ApiResult<BTreeMap<String, usize>> {
        self.ensure_allowed(kind, true).await?;
        let runner = self.runner(None).await?;
        let deleted = runner.reset_collections(kind).await?;
        info!(kind = %kind, total = deleted.values().sum::<usize>(), "种子数据已重置");
        Ok(deleted)
    }

    /// 最近一次计划运行摘要（进程内）
    pub fn last_seed_run(&self) -> Option<SeedRunSummary> {
        self.last_run.lock().ok().and_then(|last| last.clone())
    }

    /// 最近的批次运行记录
    pub async fn list_recent_runs(&self, limit: usize) -> ApiResult<Vec<ImportRunRecord>> {
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit 必须大于 0".to_string()));
        }
        Ok(self.runs.list_recent_runs(limit).await?)
    }
}
