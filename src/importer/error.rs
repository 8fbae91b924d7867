// ==========================================
// 种子数据导入引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 这里只放"致命到整个批次"的错误（加载失败等）
//       关系缺失与逐记录写入失败不走 Err，而是累积到 ImportOutcome
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 种子文件相关错误 =====
    #[error("种子文件未注册: {0}")]
    SeedFileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .json/.csv/.xlsx）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("JSON 解析失败: {0}")]
    JsonParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    // ===== 种子内容校验错误 =====
    #[error("种子文件 {file} 必须是 JSON 数组")]
    NotAnArray { file: String },

    #[error("种子文件 {file} 第 {index} 项不是对象")]
    InvalidItem { file: String, index: usize },

    #[error("种子文件 {file} 第 {index} 项缺少 stableId")]
    MissingStableId { file: String, index: usize },

    #[error("种子文件 {file} 存在重复 stableId: {stable_id}")]
    DuplicateStableId { file: String, stable_id: String },

    // ===== 环境/调度错误 =====
    #[error("生产环境禁止执行: {0}")]
    DisabledInProduction(String),

    // ===== 数据库错误 =====
    #[error("目标存储错误: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::JsonParseError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

/// stableId 解析错误
///
/// NotFound 是可恢复的关系缺口；Store 表示查询本身失败
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("未找到 {collection} 记录: {key}")]
    NotFound { collection: String, key: String },

    #[error("解析查询失败: {0}")]
    Store(#[from] RepositoryError),
}

impl ResolveError {
    pub fn not_found(collection: &str, key: impl ToString) -> Self {
        ResolveError::NotFound {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}
