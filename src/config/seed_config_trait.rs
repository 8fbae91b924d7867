// ==========================================
// 种子数据导入引擎 - 导入配置读取 Trait
// ==========================================
// 职责: 定义种子导入所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::ImportMode;
use crate::repository::RepositoryResult;
use async_trait::async_trait;
use std::path::PathBuf;

// ==========================================
// SeedConfigReader Trait
// ==========================================
// 用途: 导入触发面读取运行参数
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait SeedConfigReader: Send + Sync {
    /// 种子数据根目录
    ///
    /// # 默认值
    /// - "seed"
    async fn get_seed_data_dir(&self) -> RepositoryResult<PathBuf>;

    /// 运行环境（"production" 时禁止 demo 导入与重置）
    ///
    /// # 默认值
    /// - "development"
    async fn get_environment(&self) -> RepositoryResult<String>;

    /// 运行记录中登记的导入模式
    ///
    /// # 默认值
    /// - Upsert
    async fn get_import_mode(&self) -> RepositoryResult<ImportMode>;

    /// 运行记录中登记的匹配字段
    ///
    /// # 默认值
    /// - "stableId"
    async fn get_match_field(&self) -> RepositoryResult<String>;

    /// 并发批次上限
    ///
    /// # 默认值
    /// - 4
    async fn get_max_concurrent_batches(&self) -> RepositoryResult<usize>;

    /// 是否为生产环境
    async fn is_production(&self) -> RepositoryResult<bool> {
        Ok(self.get_environment().await?.eq_ignore_ascii_case("production"))
    }
}
