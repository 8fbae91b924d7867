// ==========================================
// 批次导入集成测试
// ==========================================
// 测试目标: 验证幂等 upsert、关系映射、逐记录失败隔离与取消
// ==========================================


use seed_importer::domain::{ImportStatus, LiveId, RelationMapping, SeedKind};
use seed_importer::importer::{
    import_collection, CollectionImporter, FileSeedLoader, ImportError, ImportRequest,
};
use seed_importer::logging;
use seed_importer::repository::{DocumentStore, SqliteDocumentStore};
use serde_json::json;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use test_helpers::{create_seed_dir, write_seed_json, MemoryResolvers, RecordingWriter};

fn clinic_mapping() -> Vec<RelationMapping> {
    vec![
        RelationMapping::single("cityStableId", "address.city", "cities").required(),
        RelationMapping::many("tagsStableIds", "tags", "tags"),
    ]
}

#[tokio::test]
async fn test_import_twice_is_idempotent() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let store = Arc::new(SqliteDocumentStore::new(&db_path).expect("Failed to open store"));

    let seed_dir = create_seed_dir();
    write_seed_json(
        &seed_dir,
        "baseline",
        "countries",
        json!([
            {"stableId": "country-de", "name": "Germany"},
            {"stableId": "country-tr", "name": "Turkey"}
        ]),
    );
    write_seed_json(
        &seed_dir,
        "baseline",
        "cities",
        json!([
            {"stableId": "city-berlin", "name": "Berlin", "countryStableId": "country-de"},
            {"stableId": "city-istanbul", "name": "Istanbul", "countryStableId": "country-tr"},
            {"stableId": "city-izmir", "name": "Izmir", "countryStableId": "country-tr"}
        ]),
    );

    let loader = FileSeedLoader::new(seed_dir.path());
    let countries = ImportRequest::new(SeedKind::Baseline, "countries", "countries");
    let cities = ImportRequest::new(SeedKind::Baseline, "cities", "cities").with_mapping(vec![
        RelationMapping::single("countryStableId", "country", "countries").required(),
    ]);

    // 第一次: 全部新建
    let first = import_collection(store.clone(), loader.clone(), &countries).await.unwrap();
    assert_eq!((first.created, first.updated), (2, 0));
    let first = import_collection(store.clone(), loader.clone(), &cities).await.unwrap();
    assert_eq!((first.created, first.updated), (3, 0));
    assert!(first.warnings.is_empty());
    assert_eq!(first.status(), ImportStatus::Completed);

    // 第二次: 全部按 stableId 命中，不产生新文档
    let second = import_collection(store.clone(), loader.clone(), &countries).await.unwrap();
    assert_eq!((second.created, second.updated), (0, 2));
    let second = import_collection(store.clone(), loader, &cities).await.unwrap();
    assert_eq!((second.created, second.updated), (0, 3));
    assert!(second.failures.is_empty());

    assert_eq!(store.count("countries").await.unwrap(), 2);
    assert_eq!(store.count("cities").await.unwrap(), 3);

    // 关系字段写入的是实时 ID，helper 字段不落库
    let germany = store.find_by_stable_id("countries", "country-de").await.unwrap().unwrap();
    let berlin = store.find_by_stable_id("cities", "city-berlin").await.unwrap().unwrap();
    assert_eq!(berlin.field("country"), Some(&germany.id.to_json()));
    assert!(berlin.field("countryStableId").is_none());
}

#[tokio::test]
async fn test_relation_written_to_nested_path() {
    let seed_dir = create_seed_dir();
    write_seed_json(
        &seed_dir,
        "demo",
        "clinics",
        json!([{
            "stableId": "clinic-1",
            "name": "Clinic One",
            "address": {"street": "Main 1"},
            "cityStableId": "city-berlin",
            "tagsStableIds": ["tag-a"]
        }]),
    );

    let importer = CollectionImporter::new(
        FileSeedLoader::new(seed_dir.path()),
        MemoryResolvers::default()
            .with("cities", "city-berlin", 7)
            .with("tags", "tag-a", 11),
        RecordingWriter::default(),
    );
    let request = ImportRequest::new(SeedKind::Demo, "clinics", "clinics").with_mapping(clinic_mapping());

    let outcome = importer.import_collection(&request).await.unwrap();
    assert_eq!(outcome.created, 1);
    assert!(outcome.warnings.is_empty());

    let payload = importer.writer().payload_of("clinic-1").unwrap();
    assert_eq!(payload["address"], json!({"street": "Main 1", "city": 7}));
    assert_eq!(payload["tags"], json!([11]));
    assert_eq!(payload["name"], json!("Clinic One"));
    assert!(!payload.contains_key("cityStableId"));
    assert!(!payload.contains_key("tagsStableIds"));
}

#[tokio::test]
async fn test_required_relation_missing_skips_record() {
    let seed_dir = create_seed_dir();
    write_seed_json(
        &seed_dir,
        "demo",
        "clinics",
        json!([
            {"stableId": "clinic-1", "name": "No City"},
            {"stableId": "clinic-2", "name": "Unknown City", "cityStableId": "city-atlantis"}
        ]),
    );

    let importer = CollectionImporter::new(
        FileSeedLoader::new(seed_dir.path()),
        MemoryResolvers::default(),
        RecordingWriter::default(),
    );
    let request = ImportRequest::new(SeedKind::Demo, "clinics", "clinics").with_mapping(clinic_mapping());

    let outcome = importer.import_collection(&request).await.unwrap();

    assert_eq!(importer.writer().call_count(), 0);
    assert_eq!((outcome.created, outcome.updated), (0, 0));
    assert!(outcome.failures.is_empty());
    assert_eq!(
        outcome.warnings,
        vec![
            "Missing cityStableId for clinics:clinic-1".to_string(),
            "Missing cityStableId for clinics:clinic-2 (city-atlantis)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_partial_many_relation_writes_resolved_subset() {
    let seed_dir = create_seed_dir();
    write_seed_json(
        &seed_dir,
        "demo",
        "clinics",
        json!([{
            "stableId": "clinic-1",
            "cityStableId": "city-berlin",
            "tagsStableIds": ["tag-a", "tag-gone"]
        }]),
    );

    let importer = CollectionImporter::new(
        FileSeedLoader::new(seed_dir.path()),
        MemoryResolvers::default()
            .with("cities", "city-berlin", 7)
            .with("tags", "tag-a", 11),
        RecordingWriter::default(),
    );
    let request = ImportRequest::new(SeedKind::Demo, "clinics", "clinics").with_mapping(clinic_mapping());

    let outcome = importer.import_collection(&request).await.unwrap();

    assert_eq!(outcome.created, 1);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].starts_with("Missing tags: 1 of 2 for clinics:clinic-1"));
    assert!(outcome.warnings[0].contains("tag-gone"));

    let payload = importer.writer().payload_of("clinic-1").unwrap();
    assert_eq!(payload["tags"], json!([11]));
}

#[tokio::test]
async fn test_write_failure_does_not_stop_batch() {
    let seed_dir = create_seed_dir();
    write_seed_json(
        &seed_dir,
        "baseline",
        "tags",
        json!([
            {"stableId": "r-1", "name": "one"},
            {"stableId": "r-2", "name": "two"},
            {"stableId": "r-3", "name": "three"}
        ]),
    );

    let importer = CollectionImporter::new(
        FileSeedLoader::new(seed_dir.path()),
        MemoryResolvers::default(),
        RecordingWriter::failing_on(&["r-2"]),
    );
    let request = ImportRequest::new(SeedKind::Baseline, "tags", "tags");

    let outcome = importer.import_collection(&request).await.unwrap();

    assert_eq!(importer.writer().call_count(), 3);
    assert_eq!(outcome.created, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].starts_with("Failed tags:r-2: "));
    assert_eq!(outcome.status(), ImportStatus::Partial);
}

#[tokio::test]
async fn test_outcome_reports_name_collection_and_counts() {
    let seed_dir = create_seed_dir();
    write_seed_json(
        &seed_dir,
        "baseline",
        "medicalSpecialties",
        json!([
            {"stableId": "spec-1", "name": "Cardiology"},
            {"stableId": "spec-2", "name": "Dermatology"},
            {"stableId": "spec-3", "name": "Oncology"},
            {"stableId": "spec-4", "name": "Neurology"}
        ]),
    );

    let importer = CollectionImporter::new(
        FileSeedLoader::new(seed_dir.path()),
        MemoryResolvers::default(),
        RecordingWriter::default(),
    );
    let request =
        ImportRequest::new(SeedKind::Baseline, "medical-specialties", "medicalSpecialties");

    let outcome = importer.import_collection(&request).await.unwrap();
    assert_eq!(outcome.name, "medicalSpecialties");
    assert_eq!(outcome.collection, "medical-specialties");
    assert_eq!(outcome.created, 4);
    assert_eq!(outcome.written(), 4);
    assert!(!outcome.cancelled);

    // 写入顺序与文件顺序一致
    let order: Vec<String> = importer
        .writer()
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|(_, sid, _)| sid.clone())
        .collect();
    assert_eq!(order, vec!["spec-1", "spec-2", "spec-3", "spec-4"]);
}

#[tokio::test]
async fn test_cancel_stops_before_next_record() {
    let seed_dir = create_seed_dir();
    write_seed_json(
        &seed_dir,
        "baseline",
        "tags",
        json!([
            {"stableId": "t-1"},
            {"stableId": "t-2"},
            {"stableId": "t-3"}
        ]),
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let importer = CollectionImporter::new(
        FileSeedLoader::new(seed_dir.path()),
        MemoryResolvers::default(),
        RecordingWriter::cancelling_after(1, cancel.clone()),
    );
    let request = ImportRequest::new(SeedKind::Baseline, "tags", "tags");

    let outcome = importer
        .import_collection_with_cancel(&request, &cancel)
        .await
        .unwrap();

    assert_eq!(importer.writer().call_count(), 1);
    assert_eq!(outcome.created, 1);
    assert!(outcome.cancelled);
    assert_eq!(outcome.status(), ImportStatus::Partial);
}

#[tokio::test]
async fn test_load_errors_abort_batch() {
    let seed_dir = create_seed_dir();
    write_seed_json(
        &seed_dir,
        "baseline",
        "tags",
        json!([{"stableId": "t-1"}, {"stableId": "t-1"}]),
    );

    let importer = CollectionImporter::new(
        FileSeedLoader::new(seed_dir.path()),
        MemoryResolvers::default(),
        RecordingWriter::default(),
    );

    let missing = ImportRequest::new(SeedKind::Baseline, "categories", "categories");
    let result = importer.import_collection(&missing).await;
    assert!(matches!(result, Err(ImportError::SeedFileNotFound(_))));

    let duplicated = ImportRequest::new(SeedKind::Baseline, "tags", "tags");
    let result = importer.import_collection(&duplicated).await;
    assert!(matches!(result, Err(ImportError::DuplicateStableId { .. })));

    assert_eq!(importer.writer().call_count(), 0);
}

#[tokio::test]
async fn test_earlier_record_in_same_batch_is_resolvable() {
    let seed_dir = create_seed_dir();
    write_seed_json(
        &seed_dir,
        "baseline",
        "medicalSpecialties",
        json!([
            {"stableId": "spec-root", "name": "Surgery"},
            {"stableId": "spec-child", "name": "Plastic Surgery", "parentSpecialtyStableId": "spec-root"}
        ]),
    );

    let importer = CollectionImporter::new(
        FileSeedLoader::new(seed_dir.path()),
        MemoryResolvers::default(),
        RecordingWriter::default(),
    );
    let request = ImportRequest::new(SeedKind::Baseline, "medical-specialties", "medicalSpecialties")
        .with_mapping(vec![RelationMapping::single(
            "parentSpecialtyStableId",
            "parentSpecialty",
            "medical-specialties",
        )]);

    let outcome = importer.import_collection(&request).await.unwrap();
    assert_eq!(outcome.created, 2);
    assert!(outcome.warnings.is_empty());

    // spec-root 写入后即可被后续记录解析
    let child = importer.writer().payload_of("spec-child").unwrap();
    assert_eq!(child["parentSpecialty"], json!(1000));
}

#[tokio::test]
async fn test_via_relation_resolves_through_link_collection() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let store = Arc::new(SqliteDocumentStore::new(&db_path).expect("Failed to open store"));

    let seed_dir = create_seed_dir();
    write_seed_json(&seed_dir, "demo", "basicUsers", json!([{"stableId": "user-1", "email": "a@b.c"}]));
    write_seed_json(
        &seed_dir,
        "demo",
        "platformStaff",
        json!([{"stableId": "staff-1", "userStableId": "user-1"}]),
    );
    write_seed_json(
        &seed_dir,
        "demo",
        "posts",
        json!([{"stableId": "post-1", "title": "Hello", "authorsUserStableIds": ["user-1"]}]),
    );

    let loader = FileSeedLoader::new(seed_dir.path());
    let steps = [
        ImportRequest::new(SeedKind::Demo, "basicUsers", "basicUsers"),
        ImportRequest::new(SeedKind::Demo, "platformStaff", "platformStaff").with_mapping(vec![
            RelationMapping::single("userStableId", "user", "basicUsers").required(),
        ]),
        ImportRequest::new(SeedKind::Demo, "posts", "posts").with_mapping(vec![
            RelationMapping::many("authorsUserStableIds", "authors", "platformStaff")
                .required()
                .via("basicUsers", "user"),
        ]),
    ];
    for request in &steps {
        let outcome = import_collection(store.clone(), loader.clone(), request).await.unwrap();
        assert_eq!(outcome.created, 1, "{}", request.collection);
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    }

    let staff = store.find_by_stable_id("platformStaff", "staff-1").await.unwrap().unwrap();
    let post = store.find_by_stable_id("posts", "post-1").await.unwrap().unwrap();
    assert_eq!(post.field("authors"), Some(&json!([staff.id.to_json()])));
    assert!(matches!(staff.id, LiveId::Int(_)));
}
