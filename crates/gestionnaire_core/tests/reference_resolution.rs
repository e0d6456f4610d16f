use gestionnaire_core::db::open_db_in_memory;
use gestionnaire_core::{
    Collection, CoreConfig, Document, DocumentStore, ProjectRef, ReportService,
    SqliteDocumentStore, Task, TaskService,
};
use rusqlite::Connection;
use serde_json::{json, Value};

const PROJECT_HEX: &str = "507f1f77bcf86cd799439011";

fn doc(value: Value) -> Document {
    serde_json::from_value(value).unwrap()
}

fn config(include_legacy: bool) -> CoreConfig {
    CoreConfig {
        include_legacy_project_field: include_legacy,
        ..CoreConfig::default()
    }
}

/// One task per historical reference shape, plus an unrelated task.
fn seed_reference_shapes(conn: &Connection) {
    let store = SqliteDocumentStore::try_new(conn).unwrap();
    store
        .insert_one(
            Collection::Projets,
            doc(json!({"_id": {"$oid": PROJECT_HEX}, "titre": "Refonte"})),
        )
        .unwrap();
    let tasks = vec![
        doc(json!({"titre": "texte canonique", "projetId": PROJECT_HEX})),
        doc(json!({"titre": "natif canonique", "projetId": {"$oid": PROJECT_HEX}})),
        doc(json!({"titre": "natif legacy", "projectId": {"$oid": PROJECT_HEX}})),
        doc(json!({"titre": "autre projet", "projetId": "64b7f0c2a1b2c3d4e5f60718"})),
    ];
    store.insert_many(Collection::Taches, tasks).unwrap();
}

fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|task| task.titre.as_str()).collect()
}

#[test]
fn project_lookup_unions_every_stored_representation() {
    let conn = open_db_in_memory().unwrap();
    seed_reference_shapes(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(store, &config(true));

    let tasks = service.tasks_by_project(PROJECT_HEX, None).unwrap();
    assert_eq!(
        titles(&tasks),
        vec!["texte canonique", "natif canonique", "natif legacy"]
    );
    for task in &tasks {
        assert_eq!(task.project_ref.project_id().as_deref(), Some(PROJECT_HEX));
    }
}

#[test]
fn legacy_field_is_ignored_unless_enabled() {
    let conn = open_db_in_memory().unwrap();
    seed_reference_shapes(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(store, &config(false));

    let tasks = service.tasks_by_project(PROJECT_HEX, None).unwrap();
    assert_eq!(titles(&tasks), vec!["texte canonique", "natif canonique"]);
}

#[test]
fn non_identifier_project_id_matches_string_references_only() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    store
        .insert_one(
            Collection::Taches,
            doc(json!({"titre": "ancien import", "projetId": "proj-42"})),
        )
        .unwrap();
    let service = TaskService::new(store, &config(true));

    let tasks = service.tasks_by_project("proj-42", None).unwrap();
    assert_eq!(titles(&tasks), vec!["ancien import"]);
    assert!(service.tasks_by_project("proj-43", None).unwrap().is_empty());
}

#[test]
fn created_tasks_store_the_canonical_native_reference() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(store, &config(false));

    let task = service
        .create_task(doc(json!({"titre": "migrée", "projectId": PROJECT_HEX})))
        .unwrap();

    let stored = store
        .find_by_id(Collection::Taches, &task.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("projetId"), Some(&json!({"$oid": PROJECT_HEX})));
    assert!(!stored.contains_key("projectId"));
    assert!(matches!(task.project_ref, ProjectRef::Canonical(_)));

    // Found with the legacy field switched off.
    let found = service.tasks_by_project(PROJECT_HEX, None).unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn top_projects_counts_mixed_representations_as_one_project() {
    let conn = open_db_in_memory().unwrap();
    seed_reference_shapes(&conn);
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let reports = ReportService::new(store, &config(true));

    let top = reports.top_projects_by_task_count().unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].project_id, PROJECT_HEX);
    assert_eq!(top[0].titre, "Refonte");
    assert_eq!(top[0].task_count, 3);
}

#[test]
fn uppercase_text_references_match_any_spelling_of_the_id() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    store
        .insert_one(
            Collection::Taches,
            doc(json!({"titre": "saisie majuscule", "projetId": PROJECT_HEX.to_uppercase()})),
        )
        .unwrap();
    let service = TaskService::new(store, &config(false));

    let lower = service.tasks_by_project(PROJECT_HEX, None).unwrap();
    assert_eq!(titles(&lower), vec!["saisie majuscule"]);
    let upper = service
        .tasks_by_project(&PROJECT_HEX.to_uppercase(), None)
        .unwrap();
    assert_eq!(titles(&upper), vec!["saisie majuscule"]);
}
