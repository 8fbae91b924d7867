// ==========================================
// 种子数据导入引擎 - 导出数据反向转换
// ==========================================
// 职责: 将目标存储导出的文档（关系字段为实时 ID）转换回种子记录（stableId）
// 说明: 映射方向与导入相反，source_field 为实时 ID 字段，target_field 为 stableId 字段
// ==========================================

use crate::domain::{LiveId, RelationMapping};
use crate::importer::error::ResolveError;
use crate::importer::importer_trait::StableIdResolvers;
use crate::importer::relation_mapper::set_value_at_path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 反向转换结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportTransform {
    pub records: Vec<Map<String, Value>>,
    pub warnings: Vec<String>,
}

/// 导出文档 → 种子记录
///
/// # 参数
/// - collection: 导出文档所属集合（用于警告文本）
/// - records: 导出文档
/// - mapping: 反向关系映射
/// - resolvers: 解析器（使用反向查询）
///
/// # 返回
/// - Err: 仅在解析查询本身失败时返回；无法反查的 ID 记为警告
pub async fn transform_export_to_seed<R>(
    collection: &str,
    records: Vec<Map<String, Value>>,
    mapping: &[RelationMapping],
    resolvers: &R,
) -> Result<ExportTransform, ResolveError>
where
    R: StableIdResolvers + ?Sized,
{
    let mut result = ExportTransform::default();

    for record in records {
        let mut output = record;

        for relation in mapping {
            let Some(value) = output.remove(&relation.source_field) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            if relation.is_many() {
                let Some(items) = value.as_array() else {
                    result.warnings.push(format!(
                        "Expected array for {} on {}",
                        relation.source_field, collection
                    ));
                    continue;
                };

                let ids: Vec<LiveId> = items.iter().filter_map(LiveId::from_json).collect();
                let resolved = resolvers
                    .resolve_many_stable_ids_by_ids(&relation.target_collection, &ids)
                    .await?;

                if !resolved.missing.is_empty() {
                    let missing: Vec<String> =
                        resolved.missing.iter().map(ToString::to_string).collect();
                    result.warnings.push(format!(
                        "Missing stableIds for {} in {}: {}",
                        relation.target_collection,
                        collection,
                        missing.join(", ")
                    ));
                }

                let stable_ids = resolved.stable_ids.into_iter().map(Value::String).collect();
                set_value_at_path(&mut output, &relation.target_field, Value::Array(stable_ids));
                continue;
            }

            let Some(id) = LiveId::from_json(&value) else {
                result.warnings.push(format!(
                    "Expected id for {} on {}",
                    relation.source_field, collection
                ));
                continue;
            };

            match resolvers
                .resolve_stable_id_by_id(&relation.target_collection, &id)
                .await
            {
                Ok(stable_id) => {
                    set_value_at_path(&mut output, &relation.target_field, Value::String(stable_id))
                }
                Err(e) if e.is_not_found() => result.warnings.push(format!(
                    "Missing stableId for {} in {}: {}",
                    relation.target_collection, collection, id
                )),
                Err(e) => return Err(e),
            }
        }

        result.records.push(output);
    }

    Ok(result)
}
