// Small utility: convert exported documents (live ids in relation fields) back into seed records.
//
// Usage:
//   cargo run --bin export_to_seed -- <db_path> <collection> <export.json> <mapping.json> [out.json]
//
// mapping.json holds a RelationMapping array in the reverse direction
// (sourceField = live id field, targetField = stableId field).

use anyhow::{bail, Context};
use seed_importer::domain::RelationMapping;
use seed_importer::importer::{transform_export_to_seed, FileSeedLoader, StableIdResolver};
use seed_importer::logging;
use seed_importer::repository::SqliteDocumentStore;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 4 {
        bail!("usage: export_to_seed <db_path> <collection> <export.json> <mapping.json> [out.json]");
    }
    let (db_path, collection, export_path, mapping_path) = (&args[0], &args[1], &args[2], &args[3]);

    let store = Arc::new(
        SqliteDocumentStore::new(db_path).with_context(|| format!("无法打开数据库: {}", db_path))?,
    );
    let records = FileSeedLoader::parse_file(Path::new(export_path))
        .with_context(|| format!("无法读取导出文件: {}", export_path))?;
    let mapping: Vec<RelationMapping> = serde_json::from_str(
        &std::fs::read_to_string(mapping_path)
            .with_context(|| format!("无法读取映射文件: {}", mapping_path))?,
    )?;

    let resolvers = StableIdResolver::new(store);
    let result = transform_export_to_seed(collection, records, &mapping, &resolvers).await?;

    for warning in &result.warnings {
        tracing::warn!("{}", warning);
    }

    let body = serde_json::to_string_pretty(&result.records)?;
    match args.get(4) {
        Some(out) => {
            std::fs::write(out, body).with_context(|| format!("无法写入: {}", out))?;
            tracing::info!(records = result.records.len(), out = %out, "种子文件已生成");
        }
        None => println!("{}", body),
    }
    Ok(())
}
