// ==========================================
// 种子数据导入引擎 - 目标存储文档
// ==========================================

use crate::domain::types::LiveId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 目标存储中的一条已持久化文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: LiveId,
    pub collection: String,
    pub stable_id: Option<String>,
    /// 属性树（不含 id / stableId）
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredDocument {
    /// 读取顶层字段
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}
