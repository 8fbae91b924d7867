// ==========================================
// 种子数据导入引擎 - 关系映射器
// ==========================================
// 职责: 将 stableId 引用替换为实时 ID，构建嵌套属性树
// 策略:
//   - 必填关系缺失 → 警告 + 跳过整条记录（不计失败）
//   - 可选关系缺失 → 省略目标字段
//   - 多值关系部分缺失 → 写入已解析子集 + 一条警告
// ==========================================

use crate::domain::{LiveId, RelationMapping, RelationResolver, RelationShape, SeedRecord};
use crate::importer::error::ResolveError;
use crate::importer::importer_trait::StableIdResolvers;
use serde_json::{Map, Value};
use tracing::debug;

/// 仅用于种子文件的辅助字段后缀，写入前剥离
const HELPER_FIELD_SUFFIXES: [&str; 2] = ["StableId", "StableIds"];

// ==========================================
// MappedRecord - 单条记录的映射结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRecord {
    /// 已解析的写入载荷
    pub payload: Map<String, Value>,
    /// 记录级警告（按映射顺序）
    pub warnings: Vec<String>,
    /// true 表示不应写入该记录
    pub skip: bool,
}

impl MappedRecord {
    fn skipped(mut self, warning: String) -> Self {
        self.warnings.push(warning);
        self.skip = true;
        self
    }
}

/// 按点分路径写入嵌套属性树
///
/// # 规则
/// - `address.city` → `{ address: { city: value } }`，与已有 `address.*` 合并
/// - 空段忽略；路径全空时不写入
/// - 中间节点不是对象时被替换为对象
pub fn set_value_at_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = target;
    for segment in parents {
        let entry = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        node = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
    node.insert(last.to_string(), value);
}

/// 剥离残留的 `*StableId` / `*StableIds` 辅助字段
pub fn strip_helper_fields(payload: &mut Map<String, Value>) {
    payload.retain(|key, _| {
        !HELPER_FIELD_SUFFIXES
            .iter()
            .any(|suffix| key.ends_with(suffix))
    });
}

// ==========================================
// RelationMapper
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RelationMapper {
    mappings: Vec<RelationMapping>,
}

impl RelationMapper {
    pub fn new(mappings: Vec<RelationMapping>) -> Self {
        Self { mappings }
    }

    pub fn mappings(&self) -> &[RelationMapping] {
        &self.mappings
    }

    /// 映射一条种子记录
    ///
    /// # 参数
    /// - collection: 记录所属集合（用于警告文本）
    /// - record: 种子记录
    /// - resolvers: stableId 解析器
    ///
    /// # 返回
    /// - Ok(MappedRecord): 载荷 + 警告 + 是否跳过
    /// - Err(ResolveError::Store): 解析查询本身失败（由调用方记为失败）
    pub async fn map_record<R>(
        &self,
        collection: &str,
        record: &SeedRecord,
        resolvers: &R,
    ) -> Result<MappedRecord, ResolveError>
    where
        R: StableIdResolvers + ?Sized,
    {
        let identifier = record.identifier(collection);
        let mut mapped = MappedRecord {
            payload: record.attributes.clone(),
            ..Default::default()
        };
        for mapping in &self.mappings {
            mapped.payload.remove(&mapping.source_field);
        }

        for mapping in &self.mappings {
            let raw = record.get(&mapping.source_field).filter(|v| !v.is_null());

            let Some(raw) = raw else {
                if mapping.required {
                    return Ok(mapped
                        .skipped(format!("Missing {} for {}", mapping.source_field, identifier)));
                }
                continue;
            };

            mapped = match mapping.shape {
                RelationShape::Single => {
                    self.map_single(mapping, raw, &identifier, resolvers, mapped)
                        .await?
                }
                RelationShape::Many => {
                    self.map_many(mapping, raw, &identifier, resolvers, mapped)
                        .await?
                }
            };
            if mapped.skip {
                debug!(record = %identifier, field = %mapping.source_field, "记录因关系缺失被跳过");
                return Ok(mapped);
            }
        }

        strip_helper_fields(&mut mapped.payload);
        Ok(mapped)
    }

    async fn map_single<R>(
        &self,
        mapping: &RelationMapping,
        raw: &Value,
        identifier: &str,
        resolvers: &R,
        mut mapped: MappedRecord,
    ) -> Result<MappedRecord, ResolveError>
    where
        R: StableIdResolvers + ?Sized,
    {
        let Some(stable_id) = raw.as_str() else {
            return Ok(mapped.skipped(format!(
                "Expected string for {} on {}",
                mapping.source_field, identifier
            )));
        };

        match resolve_one(mapping, stable_id, resolvers).await {
            Ok(id) => {
                set_value_at_path(&mut mapped.payload, &mapping.target_field, id.to_json());
                Ok(mapped)
            }
            Err(e) if e.is_not_found() => {
                let warning = format!(
                    "Missing {} for {} ({})",
                    mapping.source_field, identifier, stable_id
                );
                if mapping.required {
                    Ok(mapped.skipped(warning))
                } else {
                    mapped.warnings.push(warning);
                    Ok(mapped)
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn map_many<R>(
        &self,
        mapping: &RelationMapping,
        raw: &Value,
        identifier: &str,
        resolvers: &R,
        mut mapped: MappedRecord,
    ) -> Result<MappedRecord, ResolveError>
    where
        R: StableIdResolvers + ?Sized,
    {
        let Some(items) = raw.as_array() else {
            return Ok(mapped.skipped(format!(
                "Expected array for {} on {}",
                mapping.source_field, identifier
            )));
        };

        // 非字符串元素丢弃，其余照常解析
        let stable_ids: Vec<String> = items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect();
        let dropped = items.len() - stable_ids.len();
        if dropped > 0 {
            mapped.warnings.push(format!(
                "Ignored {} non-string entries in {} for {}",
                dropped, mapping.source_field, identifier
            ));
        }

        if stable_ids.is_empty() && mapping.required {
            return Ok(mapped.skipped(format!("Missing {} for {}", mapping.source_field, identifier)));
        }

        let (ids, missing) = resolve_many(mapping, &stable_ids, resolvers).await?;

        if !missing.is_empty() {
            let warning = format!(
                "Missing {}: {} of {} for {} ({})",
                mapping.target_field,
                missing.len(),
                stable_ids.len(),
                identifier,
                missing.join(", ")
            );
            if mapping.required && ids.is_empty() {
                return Ok(mapped.skipped(warning));
            }
            mapped.warnings.push(warning);
        }

        let values = ids.iter().map(LiveId::to_json).collect();
        set_value_at_path(&mut mapped.payload, &mapping.target_field, Value::Array(values));
        Ok(mapped)
    }
}

/// 按映射的解析方式解析单个 stableId
async fn resolve_one<R>(
    mapping: &RelationMapping,
    stable_id: &str,
    resolvers: &R,
) -> Result<LiveId, ResolveError>
where
    R: StableIdResolvers + ?Sized,
{
    match &mapping.resolver {
        RelationResolver::StableId => {
            resolvers
                .resolve_id_by_stable_id(&mapping.target_collection, stable_id)
                .await
        }
        RelationResolver::Via {
            collection,
            link_field,
        } => {
            let linked = resolvers.resolve_id_by_stable_id(collection, stable_id).await?;
            resolvers
                .resolve_id_by_link(&mapping.target_collection, link_field, &linked)
                .await
        }
    }
}

/// 批量解析，返回 (已解析 ID, 缺失 stableId)
async fn resolve_many<R>(
    mapping: &RelationMapping,
    stable_ids: &[String],
    resolvers: &R,
) -> Result<(Vec<LiveId>, Vec<String>), ResolveError>
where
    R: StableIdResolvers + ?Sized,
{
    if matches!(mapping.resolver, RelationResolver::StableId) {
        let resolved = resolvers
            .resolve_many_ids_by_stable_ids(&mapping.target_collection, stable_ids)
            .await?;
        return Ok((resolved.ids, resolved.missing));
    }

    let mut ids = Vec::new();
    let mut missing = Vec::new();
    for stable_id in stable_ids {
        match resolve_one(mapping, stable_id, resolvers).await {
            Ok(id) => ids.push(id),
            Err(e) if e.is_not_found() => missing.push(stable_id.clone()),
            Err(e) => return Err(e),
        }
    }
    Ok((ids, missing))
}
