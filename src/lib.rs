// ==========================================
// 种子数据导入引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 基于 stableId 的幂等跨记录引用导入
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 种子记录、关系映射、导入结果
pub mod domain;

// 数据仓储层 - 目标存储与运行记录
pub mod repository;

// 导入层 - 加载/解析/映射/写入/编排
pub mod importer;

// 配置层 - 运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 操作触发面
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    ImportMode, ImportOutcome, ImportStatus, LiveId, RelationMapping, RelationShape, RunStatus,
    SeedKind, SeedRecord, SeedRunSummary,
};

// 导入引擎
pub use importer::{
    import_collection, CollectionImporter, FileSeedLoader, ImportError, ImportRequest,
    SeedRunner, StableIdResolver, StoreUpsertWriter,
};

// API
pub use api::{ApiError, SeedApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "种子数据导入引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
