// ==========================================
// 种子数据导入引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供目标存储与运行记录的数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod document_store;
pub mod document_store_impl;
pub mod error;
pub mod import_run_repo;

// 重导出核心仓储
pub use document_store::DocumentStore;
pub use document_store_impl::SqliteDocumentStore;
pub use error::{RepositoryError, RepositoryResult};
pub use import_run_repo::{ImportRunRepository, SqliteImportRunRepository};
