// ==========================================
// 种子数据导入引擎 - Upsert 写入器
// ==========================================
// 职责: 按 stableId 新建或更新单条记录
// 比较: 顶层字段逐个做深度结构比较，无差异时不落库
// ==========================================

use crate::importer::importer_trait::{UpsertResult, UpsertWriter};
use crate::repository::{DocumentStore, RepositoryResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::trace;

/// 计算需要写入的字段（与现有数据深度不等的顶层字段）
pub fn changed_fields(existing: &Map<String, Value>, payload: Map<String, Value>) -> Map<String, Value> {
    payload
        .into_iter()
        .filter(|(key, value)| existing.get(key) != Some(value))
        .collect()
}

// ==========================================
// StoreUpsertWriter
// ==========================================
pub struct StoreUpsertWriter<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> StoreUpsertWriter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: DocumentStore + ?Sized> UpsertWriter for StoreUpsertWriter<S> {
    async fn upsert_by_stable_id(
        &self,
        collection: &str,
        stable_id: &str,
        payload: Map<String, Value>,
    ) -> RepositoryResult<UpsertResult> {
        match self.store.find_by_stable_id(collection, stable_id).await? {
            Some(existing) => {
                let diff = changed_fields(&existing.data, payload);
                if diff.is_empty() {
                    trace!(collection, stable_id, "内容未变化，跳过写入");
                } else {
                    self.store.update(collection, &existing.id, diff).await?;
                }
                Ok(UpsertResult {
                    live_id: existing.id,
                    created: false,
                    updated: true,
                })
            }
            None => {
                let doc = self.store.create(collection, stable_id, payload).await?;
                Ok(UpsertResult {
                    live_id: doc.id,
                    created: true,
                    updated: false,
                })
            }
        }
    }
}
