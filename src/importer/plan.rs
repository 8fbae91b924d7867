// ==========================================
// 种子数据导入引擎 - 种子计划定义
// ==========================================
// 职责: 按依赖顺序排列的批次列表（上游集合在前）
// 说明: 跨批次顺序由调用方负责，引擎本身不做拓扑排序
// ==========================================

use crate::domain::{RelationMapping, SeedKind};
use crate::importer::collection_importer::ImportRequest;
use serde::{Deserialize, Serialize};

/// 计划中的一个批次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedPlanStep {
    /// 步骤名（运行摘要与日志中使用）
    pub name: String,
    pub collection: String,
    pub file_name: String,
    #[serde(default)]
    pub mapping: Vec<RelationMapping>,
}

impl SeedPlanStep {
    pub fn new(name: &str, collection: &str, file_name: &str) -> Self {
        Self {
            name: name.to_string(),
            collection: collection.to_string(),
            file_name: file_name.to_string(),
            mapping: Vec::new(),
        }
    }

    pub fn with_mapping(mut self, mapping: Vec<RelationMapping>) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn to_request(&self, kind: SeedKind) -> ImportRequest {
        ImportRequest::new(kind, &self.collection, &self.file_name).with_mapping(self.mapping.clone())
    }
}

/// demo 数据重置顺序（子表/关联表在前）
pub const DEMO_RESET_ORDER: [&str; 10] = [
    "reviews",
    "favoriteclinics",
    "doctortreatments",
    "doctorspecialties",
    "clinictreatments",
    "doctors",
    "clinics",
    "posts",
    "platformContentMedia",
    "basicUsers",
];

/// baseline 数据重置顺序（在 demo 之后执行）
pub const BASELINE_RESET_ORDER: [&str; 7] = [
    "treatments",
    "categories",
    "tags",
    "accreditation",
    "medical-specialties",
    "cities",
    "countries",
];

/// 某类种子的重置集合（按删除顺序）
pub fn reset_order(kind: SeedKind) -> Vec<&'static str> {
    match kind {
        SeedKind::Demo => DEMO_RESET_ORDER.to_vec(),
        SeedKind::Baseline => DEMO_RESET_ORDER
            .iter()
            .chain(BASELINE_RESET_ORDER.iter())
            .copied()
            .collect(),
    }
}

pub fn plan_for(kind: SeedKind) -> Vec<SeedPlanStep> {
    match kind {
        SeedKind::Baseline => baseline_plan(),
        SeedKind::Demo => demo_plan(),
    }
}

/// 参考数据计划
pub fn baseline_plan() -> Vec<SeedPlanStep> {
    vec![
        SeedPlanStep::new("countries", "countries", "countries"),
        SeedPlanStep::new("cities", "cities", "cities").with_mapping(vec![
            RelationMapping::single("countryStableId", "country", "countries").required(),
        ]),
        SeedPlanStep::new("medical-specialties", "medical-specialties", "medicalSpecialties")
            .with_mapping(vec![RelationMapping::single(
                "parentSpecialtyStableId",
                "parentSpecialty",
                "medical-specialties",
            )]),
        SeedPlanStep::new("accreditations", "accreditation", "accreditations"),
        SeedPlanStep::new("tags", "tags", "tags"),
        SeedPlanStep::new("categories", "categories", "categories"),
        SeedPlanStep::new("treatments", "treatments", "treatments").with_mapping(vec![
            RelationMapping::single("medicalSpecialtyStableId", "medicalSpecialty", "medical-specialties")
                .required(),
            RelationMapping::many("tagsStableIds", "tags", "tags"),
        ]),
    ]
}

/// 演示数据计划
pub fn demo_plan() -> Vec<SeedPlanStep> {
    vec![
        SeedPlanStep::new("basic-users", "basicUsers", "basicUsers"),
        SeedPlanStep::new("user-profile-media", "userProfileMedia", "userProfileMedia").with_mapping(
            vec![
                RelationMapping::single("userStableId", "user.value", "basicUsers").required(),
                RelationMapping::single("createdByStableId", "createdBy.value", "basicUsers").required(),
            ],
        ),
        // 第二遍: 头像依赖 userProfileMedia，回填到 basicUsers
        SeedPlanStep::new("basic-users-profile-images", "basicUsers", "basicUsers").with_mapping(vec![
            RelationMapping::single("profileImageStableId", "profileImage", "userProfileMedia"),
        ]),
        SeedPlanStep::new("platform-content-media", "platformContentMedia", "platformContentMedia"),
        SeedPlanStep::new("posts", "posts", "posts").with_mapping(vec![
            RelationMapping::single("heroImageStableId", "heroImage", "platformContentMedia"),
            RelationMapping::single("metaImageStableId", "meta.image", "platformContentMedia"),
            RelationMapping::many("tagsStableIds", "tags", "tags"),
            RelationMapping::many("categoriesStableIds", "categories", "categories"),
            RelationMapping::many("authorsUserStableIds", "authors", "platformStaff")
                .required()
                .via("basicUsers", "user"),
            RelationMapping::many("relatedPostsStableIds", "relatedPosts", "posts"),
        ]),
        SeedPlanStep::new("clinics", "clinics", "clinics").with_mapping(vec![
            RelationMapping::single("cityStableId", "address.city", "cities").required(),
            RelationMapping::many("tagsStableIds", "tags", "tags"),
            RelationMapping::many("accreditationsStableIds", "accreditations", "accreditation"),
        ]),
        SeedPlanStep::new("doctors", "doctors", "doctors").with_mapping(vec![
            RelationMapping::single("clinicStableId", "clinic", "clinics").required(),
        ]),
        SeedPlanStep::new("clinic-treatments", "clinictreatments", "clinicTreatments").with_mapping(
            vec![
                RelationMapping::single("clinicStableId", "clinic", "clinics").required(),
                RelationMapping::single("treatmentStableId", "treatment", "treatments").required(),
            ],
        ),
        SeedPlanStep::new("doctor-specialties", "doctorspecialties", "doctorSpecialties")
            .with_mapping(vec![
                RelationMapping::single("doctorStableId", "doctor", "doctors").required(),
                RelationMapping::single(
                    "medicalSpecialtyStableId",
                    "medicalSpecialty",
                    "medical-specialties",
                )
                .required(),
            ]),
        SeedPlanStep::new("doctor-treatments", "doctortreatments", "doctorTreatments").with_mapping(
            vec![
                RelationMapping::single("doctorStableId", "doctor", "doctors").required(),
                RelationMapping::single("treatmentStableId", "treatment", "treatments").required(),
            ],
        ),
        SeedPlanStep::new("reviews", "reviews", "reviews").with_mapping(vec![
            RelationMapping::single("clinicStableId", "clinic", "clinics").required(),
            RelationMapping::single("doctorStableId", "doctor", "doctors").required(),
            RelationMapping::single("treatmentStableId", "treatment", "treatments").required(),
            RelationMapping::single("patientStableId", "patient", "platformStaff"),
        ]),
        SeedPlanStep::new("favorite-clinics", "favoriteclinics", "favoriteClinics").with_mapping(
            vec![
                RelationMapping::single("patientStableId", "patient", "patients").required(),
                RelationMapping::single("clinicStableId", "clinic", "clinics").required(),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// 每个映射引用的集合必须在计划中更早出现（自引用除外）
    fn assert_dependency_order(plan: &[SeedPlanStep], external: &[&str]) {
        let mut seen: HashSet<&str> = external.iter().copied().collect();
        for step in plan {
            seen.insert(step.collection.as_str());
            for mapping in &step.mapping {
                assert!(
                    seen.contains(mapping.target_collection.as_str()),
                    "{} 引用了尚未导入的 {}",
                    step.name,
                    mapping.target_collection
                );
            }
        }
    }

    #[test]
    fn test_baseline_plan_dependency_order() {
        assert_dependency_order(&baseline_plan(), &[]);
    }

    #[test]
    fn test_demo_plan_dependency_order() {
        let baseline: Vec<String> = baseline_plan().into_iter().map(|s| s.collection).collect();
        let mut external: Vec<&str> = baseline.iter().map(String::as_str).collect();
        // 由外部身份流程维护的集合
        external.extend(["platformStaff", "patients"]);
        assert_dependency_order(&demo_plan(), &external);
    }

    #[test]
    fn test_reset_order() {
        assert_eq!(reset_order(SeedKind::Demo).first(), Some(&"reviews"));
        let baseline = reset_order(SeedKind::Baseline);
        assert_eq!(baseline.len(), DEMO_RESET_ORDER.len() + BASELINE_RESET_ORDER.len());
        assert_eq!(baseline.last(), Some(&"countries"));
    }

    #[test]
    fn test_step_to_request() {
        let step = &baseline_plan()[1];
        let request = step.to_request(SeedKind::Baseline);
        assert_eq!(request.collection, "cities");
        assert_eq!(request.mapping.len(), 1);
        assert!(request.mapping[0].required);
    }
}
