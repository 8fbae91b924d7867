// ==========================================
// 种子数据导入引擎 - 导入层
// ==========================================
// 职责: 加载种子记录，解析跨记录引用，按 stableId 幂等写入
// 组件: 加载器 → 解析器 → 关系映射器 → 写入器 → 编排器
// ==========================================

// 模块声明
pub mod collection_importer;
pub mod error;
pub mod export_transform;
pub mod importer_trait;
pub mod plan;
pub mod relation_mapper;
pub mod seed_loader;
pub mod seed_runner;
pub mod stable_id_resolver;
pub mod upsert_writer;

// 重导出核心类型
pub use collection_importer::{import_collection, CollectionImporter, ImportRequest};
pub use error::{ImportError, ImportResult, ResolveError};
pub use export_transform::{transform_export_to_seed, ExportTransform};
pub use plan::{baseline_plan, demo_plan, plan_for, reset_order, SeedPlanStep};
pub use relation_mapper::{set_value_at_path, MappedRecord, RelationMapper};
pub use seed_loader::FileSeedLoader;
pub use seed_runner::SeedRunner;
pub use stable_id_resolver::StableIdResolver;
pub use upsert_writer::StoreUpsertWriter;

// 重导出 Trait 接口
pub use importer_trait::{
    ResolvedIds, ResolvedStableIds, SeedLoader, StableIdResolvers, UpsertResult, UpsertWriter,
};
