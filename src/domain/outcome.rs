// ==========================================
// 种子数据导入引擎 - 导入结果与运行记录
// ==========================================

use crate::domain::types::{ImportMode, ImportStatus, RunStatus, SeedKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// ImportOutcome - 单批次导入结果
// ==========================================
// 批次开始时为空，由编排器按记录顺序追加，返回给调用方
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    /// 种子文件名
    pub name: String,
    /// 目标集合
    pub collection: String,
    pub created: usize,
    pub updated: usize,
    /// 可恢复的逐记录问题（关系缺失等）
    pub warnings: Vec<String>,
    /// 逐记录写入失败
    pub failures: Vec<String>,
    /// 是否因取消而提前结束
    #[serde(default)]
    pub cancelled: bool,
}

impl ImportOutcome {
    pub fn new(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            ..Default::default()
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }

    /// 成功写入（新建 + 更新）的记录数
    pub fn written(&self) -> usize {
        self.created + self.updated
    }

    /// 推导运行记录状态
    ///
    /// # 规则
    /// - 有失败且无任何成功写入 → failed
    /// - 有失败或被取消 → partial
    /// - 其他（包括仅有警告）→ completed
    pub fn status(&self) -> ImportStatus {
        if !self.failures.is_empty() && self.written() == 0 {
            ImportStatus::Failed
        } else if !self.failures.is_empty() || self.cancelled {
            ImportStatus::Partial
        } else {
            ImportStatus::Completed
        }
    }
}

// ==========================================
// ImportRunRecord - 导入运行记录（持久化）
// ==========================================
// 对应 imports 表，一次 import_collection 调用一行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRunRecord {
    pub import_id: String,
    pub collection_slug: String,
    pub import_mode: ImportMode,
    pub match_field: String,
    pub status: ImportStatus,
    /// 序列化的 ImportOutcome（或加载错误说明）
    pub summary: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// SeedTotals - 计划级汇总
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTotals {
    pub created: usize,
    pub updated: usize,
}

// ==========================================
// SeedRunSummary - 种子计划运行摘要
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRunSummary {
    pub run_id: String,
    #[serde(rename = "type")]
    pub kind: SeedKind,
    pub reset: bool,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub totals: SeedTotals,
    pub units: Vec<ImportOutcome>,
    pub partial_failures: Vec<String>,
    /// 重置前各集合文档数（仅 reset 时填充）
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub before_counts: BTreeMap<String, usize>,
    /// 运行结束后各集合文档数（仅 reset 时填充）
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub after_counts: BTreeMap<String, usize>,
}

impl SeedRunSummary {
    /// 根据各步骤结果推导运行状态
    pub fn derive_status(units: &[ImportOutcome], partial_failures: &[String]) -> RunStatus {
        if units.is_empty() && !partial_failures.is_empty() {
            RunStatus::Failed
        } else if !partial_failures.is_empty() {
            RunStatus::Partial
        } else {
            RunStatus::Ok
        }
    }

    pub fn sum_totals(units: &[ImportOutcome]) -> SeedTotals {
        units.iter().fold(SeedTotals::default(), |acc, unit| SeedTotals {
            created: acc.created + unit.created,
            updated: acc.updated + unit.updated,
        })
    }
}
