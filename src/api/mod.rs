// ==========================================
// 种子数据导入引擎 - API层
// ==========================================
// 职责: 操作触发面（计划执行、单批次导入、重置、运行记录查询）
// ==========================================

pub mod error;
pub mod seed_api;

pub use error::{ApiError, ApiResult};
pub use seed_api::SeedApi;
