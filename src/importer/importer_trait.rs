// ==========================================
// 种子数据导入引擎 - 导入组件 Trait
// ==========================================
// 职责: 定义加载器、解析器、写入器接口（不包含实现）
// ==========================================

use crate::domain::{LiveId, SeedKind, SeedRecord};
use crate::importer::error::{ImportResult, ResolveError};
use crate::repository::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==========================================
// SeedLoader Trait
// ==========================================
// 用途: 读取一批种子记录（阶段 0）
// 实现者: FileSeedLoader
pub trait SeedLoader: Send + Sync {
    /// 加载 `(kind, file_name)` 对应的种子记录
    ///
    /// # 返回
    /// - Ok(Vec<SeedRecord>): 文件顺序的记录，每条都带 stableId
    /// - Err: 文件缺失、解析失败、stableId 缺失/重复（整个批次致命）
    ///
    /// # 说明
    /// - 纯读取，重复调用返回相同数据
    fn load_seed_file(&self, kind: SeedKind, file_name: &str) -> ImportResult<Vec<SeedRecord>>;
}

/// 批量正向解析结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedIds {
    pub ids: Vec<LiveId>,
    pub missing: Vec<String>,
}

/// 批量反向解析结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStableIds {
    pub stable_ids: Vec<String>,
    pub missing: Vec<LiveId>,
}

// ==========================================
// StableIdResolvers Trait
// ==========================================
// 用途: stableId ↔ 实时 ID 解析（阶段 1）
// 实现者: StableIdResolver
#[async_trait]
pub trait StableIdResolvers: Send + Sync {
    /// 单个 stableId → 实时 ID
    ///
    /// # 返回
    /// - Err(ResolveError::NotFound): 集合中不存在
    async fn resolve_id_by_stable_id(
        &self,
        collection: &str,
        stable_id: &str,
    ) -> Result<LiveId, ResolveError>;

    /// 批量 stableId → 实时 ID
    ///
    /// # 说明
    /// - 未解析的 stableId 全部进入 missing，不使整个调用失败
    /// - 只有存储查询本身出错时才返回 Err
    async fn resolve_many_ids_by_stable_ids(
        &self,
        collection: &str,
        stable_ids: &[String],
    ) -> Result<ResolvedIds, ResolveError>;

    /// 单个实时 ID → stableId
    async fn resolve_stable_id_by_id(
        &self,
        collection: &str,
        id: &LiveId,
    ) -> Result<String, ResolveError>;

    /// 批量实时 ID → stableId
    async fn resolve_many_stable_ids_by_ids(
        &self,
        collection: &str,
        ids: &[LiveId],
    ) -> Result<ResolvedStableIds, ResolveError>;

    /// 在 collection 中查找 link_field 等于 linked_id 的文档
    ///
    /// # 用途
    /// - 间接关系（如 basicUsers → platformStaff.user）
    async fn resolve_id_by_link(
        &self,
        collection: &str,
        link_field: &str,
        linked_id: &LiveId,
    ) -> Result<LiveId, ResolveError>;

    /// 写入成功后登记映射，供同批次后续记录命中缓存
    fn remember(&self, collection: &str, stable_id: &str, id: &LiveId);
}

/// 单条 upsert 的结果（created 与 updated 不会同时为 true）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertResult {
    pub live_id: LiveId,
    pub created: bool,
    pub updated: bool,
}

// ==========================================
// UpsertWriter Trait
// ==========================================
// 用途: 按 stableId 新建或更新（阶段 2）
// 实现者: StoreUpsertWriter
#[async_trait]
pub trait UpsertWriter: Send + Sync {
    /// 按 stableId upsert 一条记录
    ///
    /// # 返回
    /// - Ok(UpsertResult): created / updated 二选一
    /// - Err: 存储拒绝（校验/约束），只影响当前记录
    async fn upsert_by_stable_id(
        &self,
        collection: &str,
        stable_id: &str,
        payload: Map<String, Value>,
    ) -> RepositoryResult<UpsertResult>;
}
