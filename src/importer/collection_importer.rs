// ==========================================
// 种子数据导入引擎 - 批次导入编排器
// ==========================================
// 职责: 组合加载器、关系映射器、写入器，累积批次结果
// 流程: 加载 → 逐条(映射 → 写入 → 登记缓存) → 返回 ImportOutcome
// 约束:
//   - 严格按文件顺序处理，每条记录完成后才处理下一条
//   - 加载错误返回 Err；关系缺失与写入失败只累积，不中断批次
// ==========================================

use crate::domain::{ImportOutcome, RelationMapping, SeedKind, SeedRecord};
use crate::importer::error::ImportResult;
use crate::importer::importer_trait::{SeedLoader, StableIdResolvers, UpsertWriter};
use crate::importer::relation_mapper::RelationMapper;
use crate::importer::stable_id_resolver::StableIdResolver;
use crate::importer::upsert_writer::StoreUpsertWriter;
use crate::repository::DocumentStore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// ImportRequest - 单批次导入请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub kind: SeedKind,
    /// 目标集合（资源类型）
    pub collection: String,
    /// 种子文件名（不含扩展名）
    pub file_name: String,
    /// 该集合的关系映射（按顺序应用）
    #[serde(default)]
    pub mapping: Vec<RelationMapping>,
}

impl ImportRequest {
    pub fn new(kind: SeedKind, collection: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            kind,
            collection: collection.into(),
            file_name: file_name.into(),
            mapping: Vec::new(),
        }
    }

    pub fn with_mapping(mut self, mapping: Vec<RelationMapping>) -> Self {
        self.mapping = mapping;
        self
    }
}

// ==========================================
// CollectionImporter - 批次导入编排器
// ==========================================
pub struct CollectionImporter<L, R, W>
where
    L: SeedLoader,
    R: StableIdResolvers,
    W: UpsertWriter,
{
    loader: L,
    resolvers: R,
    writer: W,
}

impl<L, R, W> CollectionImporter<L, R, W>
where
    L: SeedLoader,
    R: StableIdResolvers,
    W: UpsertWriter,
{
    /// # 参数
    /// - loader: 种子文件加载器
    /// - resolvers: stableId 解析器（缓存归本批次独占）
    /// - writer: upsert 写入器
    pub fn new(loader: L, resolvers: R, writer: W) -> Self {
        Self {
            loader,
            resolvers,
            writer,
        }
    }

    pub fn resolvers(&self) -> &R {
        &self.resolvers
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// 导入一个批次
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 按记录顺序累积的计数/警告/失败
    /// - Err: 种子文件加载失败（无部分结果）
    pub async fn import_collection(&self, request: &ImportRequest) -> ImportResult<ImportOutcome> {
        self.import_collection_with_cancel(request, &AtomicBool::new(false))
            .await
    }

    /// 导入一个批次，支持取消
    ///
    /// # 说明
    /// - 每条记录开始前检查 cancel；已开始的记录会完整处理
    /// - 取消后返回部分结果，`cancelled = true`
    #[instrument(skip(self, request, cancel), fields(collection = %request.collection, file = %request.file_name))]
    pub async fn import_collection_with_cancel(
        &self,
        request: &ImportRequest,
        cancel: &AtomicBool,
    ) -> ImportResult<ImportOutcome> {
        info!(kind = %request.kind, "开始导入批次");

        // === 步骤 1: 加载种子文件 ===
        let records = self
            .loader
            .load_seed_file(request.kind, &request.file_name)
            .map_err(|e| {
                error!(error = %e, "种子文件加载失败");
                e
            })?;
        debug!(total = records.len(), "种子文件加载完成");

        // === 步骤 2: 逐条映射与写入 ===
        let mapper = RelationMapper::new(request.mapping.clone());
        let mut outcome = ImportOutcome::new(&request.file_name, &request.collection);

        for record in &records {
            if cancel.load(Ordering::SeqCst) {
                warn!(processed = outcome.written(), "批次导入已取消");
                outcome.cancelled = true;
                break;
            }
            self.import_record(&mapper, &request.collection, record, &mut outcome)
                .await;
        }

        info!(
            created = outcome.created,
            updated = outcome.updated,
            warnings = outcome.warnings.len(),
            failures = outcome.failures.len(),
            "批次导入完成"
        );
        Ok(outcome)
    }

    /// 处理单条记录，结果直接累积到 outcome
    async fn import_record(
        &self,
        mapper: &RelationMapper,
        collection: &str,
        record: &SeedRecord,
        outcome: &mut ImportOutcome,
    ) {
        let identifier = record.identifier(collection);

        let mapped = match mapper.map_record(collection, record, &self.resolvers).await {
            Ok(mapped) => mapped,
            Err(e) => {
                warn!(record = %identifier, error = %e, "关系解析失败");
                outcome.fail(format!("Failed {}: {}", identifier, e));
                return;
            }
        };

        for warning in mapped.warnings {
            warn!(record = %identifier, "{}", warning);
            outcome.warn(warning);
        }
        if mapped.skip {
            return;
        }

        match self
            .writer
            .upsert_by_stable_id(collection, &record.stable_id, mapped.payload)
            .await
        {
            Ok(result) => {
                self.resolvers
                    .remember(collection, &record.stable_id, &result.live_id);
                if result.created {
                    outcome.created += 1;
                } else if result.updated {
                    outcome.updated += 1;
                }
                debug!(record = %identifier, id = %result.live_id, created = result.created, "记录写入完成");
            }
            Err(e) => {
                warn!(record = %identifier, error = %e, "记录写入失败");
                outcome.fail(format!("Failed {}: {}", identifier, e));
            }
        }
    }
}

/// 以目标存储为后端导入一个批次
///
/// # 说明
/// - 每次调用新建解析器，缓存生命周期等于本批次
pub async fn import_collection<S, L>(
    store: Arc<S>,
    loader: L,
    request: &ImportRequest,
) -> ImportResult<ImportOutcome>
where
    S: DocumentStore + ?Sized,
    L: SeedLoader,
{
    let importer = CollectionImporter::new(
        loader,
        StableIdResolver::new(store.clone()),
        StoreUpsertWriter::new(store),
    );
    importer.import_collection(request).await
}
