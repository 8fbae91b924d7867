// ==========================================
// 种子数据导入引擎 - 领域模型层
// ==========================================
// 职责: 定义种子记录、关系映射、导入结果等领域类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod document;
pub mod outcome;
pub mod seed;
pub mod types;

// 重导出核心类型
pub use document::StoredDocument;
pub use outcome::{ImportOutcome, ImportRunRecord, SeedRunSummary, SeedTotals};
pub use seed::{RelationMapping, RelationResolver, RelationShape, SeedRecord, STABLE_ID_FIELD};
pub use types::{ImportMode, ImportStatus, LiveId, RunStatus, SeedKind};
