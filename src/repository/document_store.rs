// ==========================================
// 种子数据导入引擎 - 目标存储 Repository Trait
// ==========================================
// 职责: 定义目标存储的数据访问接口（不包含导入业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{LiveId, StoredDocument};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde_json::{Map, Value};

// ==========================================
// DocumentStore Trait
// ==========================================
// 用途: 导入引擎消费的目标持久化接口
// 实现者: SqliteDocumentStore（使用 rusqlite）
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 按 stableId 查找文档
    ///
    /// # 返回
    /// - Ok(Some): 找到文档
    /// - Ok(None): 集合中不存在该 stableId
    async fn find_by_stable_id(
        &self,
        collection: &str,
        stable_id: &str,
    ) -> RepositoryResult<Option<StoredDocument>>;

    /// 按实时 ID 查找文档
    async fn find_by_id(
        &self,
        collection: &str,
        id: &LiveId,
    ) -> RepositoryResult<Option<StoredDocument>>;

    /// 按顶层字段值查找第一条文档
    ///
    /// # 用途
    /// - 间接关系解析（如: 按 user 字段找到 platformStaff 文档）
    async fn find_one_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> RepositoryResult<Option<StoredDocument>>;

    /// 新建文档
    ///
    /// # 参数
    /// - stable_id: 文档携带的 stableId
    /// - data: 属性树
    ///
    /// # 返回
    /// - Err: 校验失败 / 约束违反（逐记录错误，由调用方决定是否中止）
    async fn create(
        &self,
        collection: &str,
        stable_id: &str,
        data: Map<String, Value>,
    ) -> RepositoryResult<StoredDocument>;

    /// 更新文档（顶层字段合并覆盖）
    async fn update(
        &self,
        collection: &str,
        id: &LiveId,
        data: Map<String, Value>,
    ) -> RepositoryResult<StoredDocument>;

    /// 删除集合中的全部文档
    ///
    /// # 返回
    /// - Ok(usize): 删除的文档数
    async fn delete_all(&self, collection: &str) -> RepositoryResult<usize>;

    /// 统计集合文档数
    async fn count(&self, collection: &str) -> RepositoryResult<usize>;
}
