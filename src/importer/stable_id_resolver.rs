// ==========================================
// 种子数据导入引擎 - stableId 解析器
// ==========================================
// 职责: stableId ↔ 实时 ID 双向解析，带单次运行缓存
// 约束: 对目标存储只读；缓存只记录命中，不持久化
// ==========================================

use crate::domain::LiveId;
use crate::importer::error::ResolveError;
use crate::importer::importer_trait::{ResolvedIds, ResolvedStableIds, StableIdResolvers};
use crate::repository::DocumentStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// 单个集合的正向/反向映射表
#[derive(Debug, Default)]
struct CollectionCache {
    forward: HashMap<String, LiveId>,
    inverse: HashMap<LiveId, String>,
}

// ==========================================
// StableIdResolver
// ==========================================
// 生命周期 = 一次批次导入；每个批次新建一个实例
pub struct StableIdResolver<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    cache: Mutex<HashMap<String, CollectionCache>>,
}

impl<S: DocumentStore + ?Sized> StableIdResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn with_cache<T>(&self, f: impl FnOnce(&mut HashMap<String, CollectionCache>) -> T) -> T {
        // 缓存只含纯数据，锁中毒时继续使用内部状态
        let mut guard = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn cached_id(&self, collection: &str, stable_id: &str) -> Option<LiveId> {
        self.with_cache(|cache| {
            cache
                .get(collection)
                .and_then(|c| c.forward.get(stable_id).cloned())
        })
    }

    fn cached_stable_id(&self, collection: &str, id: &LiveId) -> Option<String> {
        self.with_cache(|cache| cache.get(collection).and_then(|c| c.inverse.get(id).cloned()))
    }

    fn insert(&self, collection: &str, stable_id: &str, id: &LiveId) {
        self.with_cache(|cache| {
            let entry = cache.entry(collection.to_string()).or_default();
            entry.forward.insert(stable_id.to_string(), id.clone());
            entry.inverse.insert(id.clone(), stable_id.to_string());
        });
    }

    /// 当前缓存的条目数（诊断用）
    pub fn cached_len(&self, collection: &str) -> usize {
        self.with_cache(|cache| cache.get(collection).map_or(0, |c| c.forward.len()))
    }
}

#[async_trait]
impl<S: DocumentStore + ?Sized> StableIdResolvers for StableIdResolver<S> {
    async fn resolve_id_by_stable_id(
        &self,
        collection: &str,
        stable_id: &str,
    ) -> Result<LiveId, ResolveError> {
        if let Some(id) = self.cached_id(collection, stable_id) {
            trace!(collection, stable_id, "解析命中缓存");
            return Ok(id);
        }

        match self.store.find_by_stable_id(collection, stable_id).await? {
            Some(doc) => {
                self.insert(collection, stable_id, &doc.id);
                Ok(doc.id)
            }
            None => Err(ResolveError::not_found(collection, stable_id)),
        }
    }

    async fn resolve_many_ids_by_stable_ids(
        &self,
        collection: &str,
        stable_ids: &[String],
    ) -> Result<ResolvedIds, ResolveError> {
        let mut resolved = ResolvedIds::default();
        for stable_id in stable_ids {
            match self.resolve_id_by_stable_id(collection, stable_id).await {
                Ok(id) => resolved.ids.push(id),
                Err(e) if e.is_not_found() => resolved.missing.push(stable_id.clone()),
                Err(e) => return Err(e),
            }
        }
        Ok(resolved)
    }

    async fn resolve_stable_id_by_id(
        &self,
        collection: &str,
        id: &LiveId,
    ) -> Result<String, ResolveError> {
        if let Some(stable_id) = self.cached_stable_id(collection, id) {
            return Ok(stable_id);
        }

        let doc = self
            .store
            .find_by_id(collection, id)
            .await?
            .ok_or_else(|| ResolveError::not_found(collection, id))?;

        // 存在但未携带 stableId 的文档无法反向解析
        let stable_id = doc
            .stable_id
            .ok_or_else(|| ResolveError::not_found(collection, id))?;
        self.insert(collection, &stable_id, id);
        Ok(stable_id)
    }

    async fn resolve_many_stable_ids_by_ids(
        &self,
        collection: &str,
        ids: &[LiveId],
    ) -> Result<ResolvedStableIds, ResolveError> {
        let mut resolved = ResolvedStableIds::default();
        for id in ids {
            match self.resolve_stable_id_by_id(collection, id).await {
                Ok(stable_id) => resolved.stable_ids.push(stable_id),
                Err(e) if e.is_not_found() => resolved.missing.push(id.clone()),
                Err(e) => return Err(e),
            }
        }
        Ok(resolved)
    }

    async fn resolve_id_by_link(
        &self,
        collection: &str,
        link_field: &str,
        linked_id: &LiveId,
    ) -> Result<LiveId, ResolveError> {
        let doc = self
            .store
            .find_one_by_field(collection, link_field, &linked_id.to_json())
            .await?;

        doc.map(|d| d.id)
            .ok_or_else(|| ResolveError::not_found(collection, format!("{}={}", link_field, linked_id)))
    }

    fn remember(&self, collection: &str, stable_id: &str, id: &LiveId) {
        self.insert(collection, stable_id, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SqliteDocumentStore;
    use serde_json::json;
    use tempfile::NamedTempFile;

    async fn setup() -> (NamedTempFile, Arc<SqliteDocumentStore>) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = SqliteDocumentStore::new(temp_file.path().to_str().unwrap()).unwrap();
        let store = Arc::new(store);
        for sid in ["tag-a", "tag-b"] {
            store
                .create("tags", sid, json!({"name": sid}).as_object().cloned().unwrap())
                .await
                .unwrap();
        }
        (temp_file, store)
    }

    #[tokio::test]
    async fn test_single_resolution_and_not_found() {
        let (_tmp, store) = setup().await;
        let resolver = StableIdResolver::new(store);

        let id = resolver.resolve_id_by_stable_id("tags", "tag-a").await.unwrap();
        assert_eq!(resolver.resolve_stable_id_by_id("tags", &id).await.unwrap(), "tag-a");

        let err = resolver
            .resolve_id_by_stable_id("tags", "tag-missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_batch_reports_missing_without_failing() {
        let (_tmp, store) = setup().await;
        let resolver = StableIdResolver::new(store);

        let resolved = resolver
            .resolve_many_ids_by_stable_ids(
                "tags",
                &["tag-a".to_string(), "tag-missing".to_string(), "tag-b".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(resolved.ids.len(), 2);
        assert_eq!(resolved.missing, vec!["tag-missing".to_string()]);
    }

    #[tokio::test]
    async fn test_hits_are_cached_and_misses_are_not() {
        let (_tmp, store) = setup().await;
        let resolver = StableIdResolver::new(store.clone());

        resolver.resolve_id_by_stable_id("tags", "tag-a").await.unwrap();
        assert!(resolver.resolve_id_by_stable_id("tags", "tag-c").await.is_err());
        assert_eq!(resolver.cached_len("tags"), 1);

        // 后续写入的记录在同一运行内仍可解析
        store
            .create("tags", "tag-c", json!({"name": "c"}).as_object().cloned().unwrap())
            .await
            .unwrap();
        assert!(resolver.resolve_id_by_stable_id("tags", "tag-c").await.is_ok());
    }

    #[tokio::test]
    async fn test_remember_short_circuits_store() {
        let (_tmp, store) = setup().await;
        let resolver = StableIdResolver::new(store);

        resolver.remember("clinics", "c-1", &LiveId::Int(42));
        assert_eq!(
            resolver.resolve_id_by_stable_id("clinics", "c-1").await.unwrap(),
            LiveId::Int(42)
        );
        assert_eq!(
            resolver
                .resolve_stable_id_by_id("clinics", &LiveId::Int(42))
                .await
                .unwrap(),
            "c-1"
        );
    }

    #[tokio::test]
    async fn test_resolve_by_link() {
        let (_tmp, store) = setup().await;
        let user = store
            .create("basicUsers", "u-1", json!({"email": "a@b.c"}).as_object().cloned().unwrap())
            .await
            .unwrap();
        let staff = store
            .create(
                "platformStaff",
                "s-1",
                json!({"user": user.id.to_json()}).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();

        let resolver = StableIdResolver::new(store);
        let found = resolver
            .resolve_id_by_link("platformStaff", "user", &user.id)
            .await
            .unwrap();
        assert_eq!(found, staff.id);
    }
}
