// ==========================================
// 种子数据导入引擎 - 命令行入口
// ==========================================
// 用法:
//   seed-importer [db_path] [data_dir] [baseline|demo] [--reset]
//
// db_path 缺省时使用 SEED_IMPORTER_DB_PATH 或用户数据目录；
// data_dir 缺省时使用配置 seed.data_dir。
// 运行摘要以 JSON 输出到 stdout。
// ==========================================

use anyhow::{bail, Context};
use seed_importer::config::get_default_db_path;
use seed_importer::domain::{RunStatus, SeedKind};
use seed_importer::{logging, SeedApi};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut reset = false;
    let mut positional = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--reset" => reset = true,
            "-h" | "--help" => {
                println!("usage: seed-importer [db_path] [data_dir] [baseline|demo] [--reset]");
                return Ok(());
            }
            _ => positional.push(arg),
        }
    }
    let mut args = positional.into_iter();

    let db_path = args
        .next()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(get_default_db_path);
    let data_dir = args.next().filter(|s| !s.trim().is_empty()).map(PathBuf::from);
    let kind = match args.next() {
        Some(raw) => match SeedKind::from_str(&raw) {
            Some(kind) => kind,
            None => bail!("无效的种子类型: {}（仅支持 baseline/demo）", raw),
        },
        None => SeedKind::Baseline,
    };

    tracing::info!("==================================================");
    tracing::info!("{} v{}", seed_importer::APP_NAME, seed_importer::VERSION);
    tracing::info!(db_path = %db_path, kind = %kind, reset, "启动种子导入");
    tracing::info!("==================================================");

    let api = SeedApi::new(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))?;
    let summary = api
        .run_seed(kind, reset, data_dir)
        .await
        .context("种子计划执行失败")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.status == RunStatus::Failed {
        bail!("种子计划失败: {}", summary.partial_failures.join("; "));
    }
    Ok(())
}
