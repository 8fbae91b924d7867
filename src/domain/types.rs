// ==========================================
// 种子数据导入引擎 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 存储实时 ID (Live ID)
// ==========================================
// 目标存储自行分配的标识，可能是整数主键或文本主键
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiveId {
    Int(i64),
    Text(String),
}

impl LiveId {
    /// 从 JSON 值解析（数字或非空字符串）
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(LiveId::Int),
            serde_json::Value::String(s) if !s.is_empty() => Some(LiveId::Text(s.clone())),
            _ => None,
        }
    }

    /// 转换为写入载荷中的 JSON 值
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            LiveId::Int(id) => serde_json::Value::from(*id),
            LiveId::Text(id) => serde_json::Value::from(id.as_str()),
        }
    }
}

impl fmt::Display for LiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveId::Int(id) => write!(f, "{}", id),
            LiveId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for LiveId {
    fn from(id: i64) -> Self {
        LiveId::Int(id)
    }
}

impl From<&str> for LiveId {
    fn from(id: &str) -> Self {
        LiveId::Text(id.to_string())
    }
}

// ==========================================
// 种子类型 (Seed Kind)
// ==========================================
// baseline: 参考数据（国家/城市/专科/标签），生产环境允许
// demo: 演示数据（诊所/医生/评价），生产环境禁止
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedKind {
    Baseline,
    Demo,
}

impl SeedKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "baseline" => Some(SeedKind::Baseline),
            "demo" => Some(SeedKind::Demo),
            _ => None,
        }
    }

    /// 种子文件所在子目录名
    pub fn dir_name(&self) -> &'static str {
        match self {
            SeedKind::Baseline => "baseline",
            SeedKind::Demo => "demo",
        }
    }
}

impl fmt::Display for SeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

// ==========================================
// 导入模式 (Import Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    Create,
    Update,
    Upsert,
}

impl ImportMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "create" => Some(ImportMode::Create),
            "update" => Some(ImportMode::Update),
            "upsert" => Some(ImportMode::Upsert),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ImportMode::Create => "create",
            ImportMode::Update => "update",
            ImportMode::Upsert => "upsert",
        }
    }
}

// ==========================================
// 导入运行状态 (Import Status)
// ==========================================
// pending -> completed | partial | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Completed,
    Partial,
    Failed,
}

impl ImportStatus {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "completed" => ImportStatus::Completed,
            "partial" => ImportStatus::Partial,
            "failed" => ImportStatus::Failed,
            _ => ImportStatus::Pending, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Completed => "completed",
            ImportStatus::Partial => "partial",
            ImportStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 种子计划运行状态 (Run Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Partial,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_id_from_json() {
        assert_eq!(LiveId::from_json(&serde_json::json!(42)), Some(LiveId::Int(42)));
        assert_eq!(
            LiveId::from_json(&serde_json::json!("doc-1")),
            Some(LiveId::Text("doc-1".to_string()))
        );
        assert_eq!(LiveId::from_json(&serde_json::json!("")), None);
        assert_eq!(LiveId::from_json(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_live_id_serializes_untagged() {
        let ids = vec![LiveId::Int(7), LiveId::Text("abc".to_string())];
        let json = serde_json::to_string(&ids).unwrap();
        assert_eq!(json, r#"[7,"abc"]"#);
    }

    #[test]
    fn test_seed_kind_from_str() {
        assert_eq!(SeedKind::from_str("Demo"), Some(SeedKind::Demo));
        assert_eq!(SeedKind::from_str(" baseline "), Some(SeedKind::Baseline));
        assert_eq!(SeedKind::from_str("prod"), None);
    }

    #[test]
    fn test_import_status_round_trip_db_str() {
        for status in [
            ImportStatus::Pending,
            ImportStatus::Completed,
            ImportStatus::Partial,
            ImportStatus::Failed,
        ] {
            assert_eq!(ImportStatus::from_str(status.to_db_str()), status);
        }
    }
}
