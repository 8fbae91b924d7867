// ==========================================
// 种子数据导入引擎 - 种子计划执行器
// ==========================================
// 职责: 按计划顺序执行批次、记录运行记录、汇总运行摘要
// 策略:
//   - baseline: 任一批次加载失败即中止（fail-fast）
//   - demo: 批次失败记入 partial_failures，继续后续批次
// 并发: 计划内批次顺序执行；run_independent_batches 并发执行互不依赖的批次
// ==========================================

use crate::domain::{
    ImportMode, ImportOutcome, ImportRunRecord, ImportStatus, SeedKind, SeedRunSummary,
    STABLE_ID_FIELD,
};
use crate::importer::collection_importer::import_collection;
use crate::importer::error::ImportResult;
use crate::importer::importer_trait::SeedLoader;
use crate::importer::plan::{reset_order, SeedPlanStep};
use crate::repository::{DocumentStore, ImportRunRepository};
use chrono::Utc;
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// 默认并发批次数
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 4;

// ==========================================
// SeedRunner
// ==========================================
pub struct SeedRunner<S, L>
where
    S: DocumentStore + ?Sized,
    L: SeedLoader + Clone,
{
    store: Arc<S>,
    loader: L,
    runs: Option<Arc<dyn ImportRunRepository>>,
    import_mode: ImportMode,
    match_field: String,
    max_concurrent_batches: usize,
}

impl<S, L> SeedRunner<S, L>
where
    S: DocumentStore + ?Sized,
    L: SeedLoader + Clone,
{
    pub fn new(store: Arc<S>, loader: L) -> Self {
        Self {
            store,
            loader,
            runs: None,
            import_mode: ImportMode::Upsert,
            match_field: STABLE_ID_FIELD.to_string(),
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
        }
    }

    /// 启用运行记录持久化
    pub fn with_run_repository(mut self, runs: Arc<dyn ImportRunRepository>) -> Self {
        self.runs = Some(runs);
        self
    }

    /// 运行记录中登记的导入模式与匹配字段
    pub fn with_import_settings(mut self, mode: ImportMode, match_field: impl Into<String>) -> Self {
        self.import_mode = mode;
        self.match_field = match_field.into();
        self
    }

    pub fn with_max_concurrent_batches(mut self, max: usize) -> Self {
        self.max_concurrent_batches = max.max(1);
        self
    }

    /// 执行单个批次并登记运行记录（pending → completed/partial/failed）
    #[instrument(skip(self, step), fields(step = %step.name))]
    pub async fn run_step(&self, kind: SeedKind, step: &SeedPlanStep) -> ImportResult<ImportOutcome> {
        let import_id = Uuid::new_v4().to_string();
        self.record_pending(&import_id, step).await;

        let result = import_collection(self.store.clone(), self.loader.clone(), &step.to_request(kind)).await;

        match &result {
            Ok(outcome) => {
                let summary = serde_json::to_value(outcome).unwrap_or(Value::Null);
                self.record_final(&import_id, outcome.status(), summary).await;
            }
            Err(e) => {
                let summary = json!({ "name": step.file_name, "error": e.to_string() });
                self.record_final(&import_id, ImportStatus::Failed, summary).await;
            }
        }
        result
    }

    /// 按顺序执行整个计划
    ///
    /// # 参数
    /// - kind: 种子类型（决定失败策略与文件目录）
    /// - plan: 已按依赖排序的批次
    /// - reset: 执行前先清空该类型的集合
    ///
    /// # 返回
    /// - Ok(SeedRunSummary): 运行摘要
    /// - Err: baseline 批次加载失败（fail-fast）或重置失败
    #[instrument(skip(self, plan), fields(kind = %kind, steps = plan.len()))]
    pub async fn run_plan(
        &self,
        kind: SeedKind,
        plan: &[SeedPlanStep],
        reset: bool,
    ) -> ImportResult<SeedRunSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, reset, "开始执行种子计划");

        let mut before_counts = BTreeMap::new();
        if reset {
            before_counts = self.count_collections(kind).await?;
            self.reset_collections(kind).await?;
        }

        let mut units = Vec::new();
        let mut partial_failures = Vec::new();

        for step in plan {
            match self.run_step(kind, step).await {
                Ok(outcome) => {
                    if !outcome.failures.is_empty() {
                        partial_failures.push(format!(
                            "{}: {} record failures",
                            step.name,
                            outcome.failures.len()
                        ));
                    }
                    units.push(outcome);
                }
                Err(e) if kind == SeedKind::Baseline => {
                    error!(step = %step.name, error = %e, "baseline 批次失败，中止计划");
                    return Err(e);
                }
                Err(e) => {
                    warn!(step = %step.name, error = %e, "demo 批次失败，继续后续批次");
                    partial_failures.push(format!("{}: {}", step.name, e));
                }
            }
        }

        let after_counts = if reset {
            self.count_collections(kind).await?
        } else {
            BTreeMap::new()
        };

        let finished_at = Utc::now();
        let summary = SeedRunSummary {
            run_id,
            kind,
            reset,
            status: SeedRunSummary::derive_status(&units, &partial_failures),
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds(),
            totals: SeedRunSummary::sum_totals(&units),
            units,
            partial_failures,
            before_counts,
            after_counts,
        };

        info!(
            status = ?summary.status,
            created = summary.totals.created,
            updated = summary.totals.updated,
            duration_ms = summary.duration_ms,
            "种子计划执行完成"
        );
        Ok(summary)
    }

    /// 并发执行互不依赖的批次
    ///
    /// # 说明
    /// - 每组最多 max_concurrent_batches 个批次同时执行
    /// - 每个批次独立的解析器缓存；结果按输入顺序返回
    pub async fn run_independent_batches(
        &self,
        kind: SeedKind,
        steps: &[SeedPlanStep],
    ) -> Vec<ImportResult<ImportOutcome>> {
        let mut results = Vec::with_capacity(steps.len());
        for chunk in steps.chunks(self.max_concurrent_batches) {
            let batch = join_all(chunk.iter().map(|step| self.run_step(kind, step))).await;
            results.extend(batch);
        }
        results
    }

    /// 按删除顺序清空该类型的集合
    ///
    /// # 返回
    /// - 每个集合删除的文档数
    pub async fn reset_collections(&self, kind: SeedKind) -> ImportResult<BTreeMap<String, usize>> {
        let mut deleted = BTreeMap::new();
        for collection in reset_order(kind) {
            let count = self.store.delete_all(collection).await?;
            info!(collection, deleted = count, "集合已清空");
            deleted.insert(collection.to_string(), count);
        }
        Ok(deleted)
    }

    async fn count_collections(&self, kind: SeedKind) -> ImportResult<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();
        for collection in reset_order(kind) {
            counts.insert(collection.to_string(), self.store.count(collection).await?);
        }
        Ok(counts)
    }

    // ===== 运行记录（审计用，写入失败只记日志）=====

    async fn record_pending(&self, import_id: &str, step: &SeedPlanStep) {
        let Some(runs) = &self.runs else {
            return;
        };
        let now = Utc::now();
        let record = ImportRunRecord {
            import_id: import_id.to_string(),
            collection_slug: step.collection.clone(),
            import_mode: self.import_mode,
            match_field: self.match_field.clone(),
            status: ImportStatus::Pending,
            summary: None,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = runs.insert_run(record).await {
            warn!(import_id, error = %e, "运行记录写入失败");
        }
    }

    async fn record_final(&self, import_id: &str, status: ImportStatus, summary: Value) {
        let Some(runs) = &self.runs else {
            return;
        };
        if let Err(e) = runs.finalize_run(import_id, status, summary).await {
            warn!(import_id, error = %e, "运行记录更新失败");
        }
    }
}
