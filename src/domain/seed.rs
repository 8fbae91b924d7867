// ==========================================
// 种子数据导入引擎 - 种子记录与关系映射
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 种子记录中承载 stableId 的字段名
pub const STABLE_ID_FIELD: &str = "stableId";

// ==========================================
// SeedRecord - 种子记录
// ==========================================
// 一条逻辑实体的属性包: stableId + 普通字段 + 关系引用字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRecord {
    #[serde(rename = "stableId")]
    pub stable_id: String,

    /// 除 stableId 外的全部属性（保持文件中的字段顺序无关语义）
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl SeedRecord {
    pub fn new(stable_id: impl Into<String>, attributes: Map<String, Value>) -> Self {
        let mut attributes = attributes;
        attributes.remove(STABLE_ID_FIELD);
        Self {
            stable_id: stable_id.into(),
            attributes,
        }
    }

    /// 诊断用记录标识: `<collection>:<stableId>`
    pub fn identifier(&self, collection: &str) -> String {
        format!("{}:{}", collection, self.stable_id)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }
}

// ==========================================
// RelationShape - 关系形态
// ==========================================
// Single: 字段值为单个 stableId
// Many: 字段值为 stableId 列表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationShape {
    #[default]
    Single,
    Many,
}

// ==========================================
// RelationResolver - 关系解析方式
// ==========================================
// StableId: 直接在目标集合按 stableId 查找
// Via: 先在中间集合按 stableId 查找，再在目标集合中按 link_field 找到引用该记录的文档
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RelationResolver {
    #[default]
    StableId,
    #[serde(rename_all = "camelCase")]
    Via { collection: String, link_field: String },
}

// ==========================================
// RelationMapping - 关系映射规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationMapping {
    /// 种子记录中的源字段
    pub source_field: String,

    /// 写入载荷中的目标字段（支持点分路径，如 `address.city`）
    pub target_field: String,

    /// 目标资源类型（集合）
    #[serde(rename = "collection")]
    pub target_collection: String,

    #[serde(default)]
    pub shape: RelationShape,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub resolver: RelationResolver,
}

impl RelationMapping {
    /// 单值关系（可选）
    pub fn single(
        source_field: impl Into<String>,
        target_field: impl Into<String>,
        target_collection: impl Into<String>,
    ) -> Self {
        Self {
            source_field: source_field.into(),
            target_field: target_field.into(),
            target_collection: target_collection.into(),
            shape: RelationShape::Single,
            required: false,
            resolver: RelationResolver::StableId,
        }
    }

    /// 多值关系（可选）
    pub fn many(
        source_field: impl Into<String>,
        target_field: impl Into<String>,
        target_collection: impl Into<String>,
    ) -> Self {
        Self {
            shape: RelationShape::Many,
            ..Self::single(source_field, target_field, target_collection)
        }
    }

    /// 标记为必填关系
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 通过中间集合间接解析
    pub fn via(mut self, collection: impl Into<String>, link_field: impl Into<String>) -> Self {
        self.resolver = RelationResolver::Via {
            collection: collection.into(),
            link_field: link_field.into(),
        };
        self
    }

    pub fn is_many(&self) -> bool {
        matches!(self.shape, RelationShape::Many)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seed_record_strips_stable_id_from_attributes() {
        let attrs = json!({"stableId": "r-1", "name": "Clinic"})
            .as_object()
            .cloned()
            .unwrap();
        let record = SeedRecord::new("r-1", attrs);

        assert_eq!(record.stable_id, "r-1");
        assert!(record.get("stableId").is_none());
        assert_eq!(record.get("name"), Some(&json!("Clinic")));
        assert_eq!(record.identifier("clinics"), "clinics:r-1");
    }

    #[test]
    fn test_seed_record_serializes_flat() {
        let record: SeedRecord =
            serde_json::from_value(json!({"stableId": "r-1", "cityRef": "city-1"})).unwrap();
        assert_eq!(record.stable_id, "r-1");
        assert_eq!(record.get("cityRef"), Some(&json!("city-1")));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back, json!({"stableId": "r-1", "cityRef": "city-1"}));
    }

    #[test]
    fn test_relation_mapping_defaults_from_json() {
        let mapping: RelationMapping = serde_json::from_value(json!({
            "sourceField": "cityStableId",
            "targetField": "address.city",
            "collection": "cities"
        }))
        .unwrap();

        assert_eq!(mapping, RelationMapping::single("cityStableId", "address.city", "cities"));
        assert!(!mapping.required);
        assert!(!mapping.is_many());
    }

    #[test]
    fn test_relation_mapping_via_resolver_from_json() {
        let mapping: RelationMapping = serde_json::from_value(json!({
            "sourceField": "authorsUserStableIds",
            "targetField": "authors",
            "collection": "platformStaff",
            "shape": "many",
            "required": true,
            "resolver": {"kind": "via", "collection": "basicUsers", "linkField": "user"}
        }))
        .unwrap();

        let expected = RelationMapping::many("authorsUserStableIds", "authors", "platformStaff")
            .required()
            .via("basicUsers", "user");
        assert_eq!(mapping, expected);
    }
}
