use gestionnaire_core::db::open_db_in_memory;
use gestionnaire_core::{
    Collection, CoreConfig, CoreError, Document, DocumentStore, Filter, ObjectId, PageRequest,
    ProjectService, SqliteDocumentStore, TaskFilter, TaskService, UserFilter, UserService,
};
use serde_json::{json, Value};

fn doc(value: Value) -> Document {
    serde_json::from_value(value).unwrap()
}

fn dated(titre: &str, status: &str, created_at: &str) -> Document {
    doc(json!({"titre": titre, "status": status, "created_at": created_at}))
}

#[test]
fn create_task_stamps_identity_and_creation_time() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(store, &CoreConfig::default());

    let task = service
        .create_task(doc(json!({
            "_id": "caller-chosen",
            "created_at": "1999-01-01",
            "titre": "Écrire la doc",
            "status": "TODO",
            "priorite": 2
        })))
        .unwrap();

    assert_ne!(task.created_at.as_deref(), Some("1999-01-01"));
    assert!(task.created_at.as_deref().unwrap().ends_with('Z'));
    assert_eq!(task.extra.get("priorite"), Some(&json!(2)));

    let fetched = service.get_task(&task.id.to_hex()).unwrap().unwrap();
    assert_eq!(fetched, task);
}

#[test]
fn create_task_requires_a_title() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(store, &CoreConfig::default());

    let err = service
        .create_task(doc(json!({"status": "TODO"})))
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument(_)));
    assert_eq!(
        store.count(Collection::Taches, &Filter::All).unwrap(),
        0
    );
}

#[test]
fn update_task_replaces_fields_but_never_identity_or_creation_time() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(store, &CoreConfig::default());
    let task = service
        .create_task(doc(json!({"titre": "Relire", "status": "TODO"})))
        .unwrap();

    let updated = service
        .update_task(
            &task.id.to_hex(),
            doc(json!({
                "status": "DONE",
                "created_at": "2000-01-01",
                "_id": {"$oid": ObjectId::new().to_hex()}
            })),
        )
        .unwrap();

    assert_eq!(updated.id, task.id);
    assert_eq!(updated.created_at, task.created_at);
    assert_eq!(updated.status.as_deref(), Some("DONE"));
    assert_eq!(updated.titre, "Relire");

    let nested = service
        .update_task(
            &task.id.to_hex(),
            doc(json!({
                "_id.$oid": "ffffffffffffffffffffffff",
                "created_at.annee": 2000,
                "status": "TODO"
            })),
        )
        .unwrap();
    assert_eq!(nested.id, task.id);
    assert_eq!(nested.created_at, task.created_at);
    assert_eq!(nested.status.as_deref(), Some("TODO"));

    let stored = store
        .find_by_id(Collection::Taches, &task.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("_id"), Some(&json!({"$oid": task.id.to_hex()})));
}

#[test]
fn empty_patch_returns_the_current_task() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(store, &CoreConfig::default());
    let task = service
        .create_task(doc(json!({"titre": "Stable"})))
        .unwrap();

    let same = service.update_task(&task.id.to_hex(), Document::new()).unwrap();
    assert_eq!(same, task);
}

#[test]
fn update_of_missing_task_is_not_found_and_bad_ids_are_invalid() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(store, &CoreConfig::default());
    let missing = ObjectId::new().to_hex();

    let err = service
        .update_task(&missing, doc(json!({"status": "DONE"})))
        .unwrap_err();
    match err {
        CoreError::NotFound { collection, id } => {
            assert_eq!(collection, Collection::Taches);
            assert_eq!(id, missing);
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = service
        .update_task("pas-un-id", doc(json!({"status": "DONE"})))
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument(_)));
    assert!(matches!(
        service.get_task("xyz").unwrap_err(),
        CoreError::InvalidArgument(_)
    ));
    assert!(service.get_task(&missing).unwrap().is_none());
}

#[test]
fn tasks_by_assignee_returns_only_that_user() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(store, &CoreConfig::default());
    for (titre, assignee) in [("a", "u1"), ("b", "u2"), ("c", "u1")] {
        service
            .create_task(doc(json!({"titre": titre, "assignee": assignee})))
            .unwrap();
    }

    let tasks = service.tasks_by_assignee("u1").unwrap();
    let titles: Vec<_> = tasks.iter().map(|task| task.titre.as_str()).collect();
    assert_eq!(titles, vec!["a", "c"]);
    assert!(service.tasks_by_assignee("u3").unwrap().is_empty());
}

#[test]
fn tasks_by_project_narrows_by_case_insensitive_literal_title() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = TaskService::new(store, &CoreConfig::default());
    let project = ProjectService::new(store)
        .create_project(doc(json!({"titre": "Site"})))
        .unwrap();
    let project_id = project.id.to_hex();
    for titre in ["Maquette v2", "maquette (mobile)", "Déploiement"] {
        service
            .create_task(doc(json!({"titre": titre, "projetId": project_id})))
            .unwrap();
    }
    service
        .create_task(doc(json!({"titre": "Maquette ailleurs"})))
        .unwrap();

    let tasks = service.tasks_by_project(&project_id, Some("MAQUETTE")).unwrap();
    let titles: Vec<_> = tasks.iter().map(|task| task.titre.as_str()).collect();
    assert_eq!(titles, vec!["Maquette v2", "maquette (mobile)"]);

    let literal = service.tasks_by_project(&project_id, Some("(mobile)")).unwrap();
    assert_eq!(literal.len(), 1);

    let all = service.tasks_by_project(&project_id, Some("  ")).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn list_tasks_filters_by_status_and_creation_range() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    store
        .insert_many(
            Collection::Taches,
            vec![
                dated("déc", "TODO", "2024-12-31T12:00:00.000Z"),
                dated("jan", "TODO", "2025-01-15T12:00:00.000Z"),
                dated("jan fini", "DONE", "2025-01-20T12:00:00.000Z"),
                dated("fév", "TODO", "2025-02-01T00:00:00.000Z"),
            ],
        )
        .unwrap();
    let service = TaskService::new(store, &CoreConfig::default());

    let filter = TaskFilter {
        status: Some("TODO".to_string()),
        created_between: Some((
            "2025-01-01".to_string(),
            "2025-01-31T23:59:59.999Z".to_string(),
        )),
    };
    let page = service.list_tasks(&filter, PageRequest::default()).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].titre, "jan");

    let bad = TaskFilter {
        status: None,
        created_between: Some(("janvier".to_string(), "2025-01-31".to_string())),
    };
    assert!(matches!(
        service.list_tasks(&bad, PageRequest::default()).unwrap_err(),
        CoreError::InvalidArgument(_)
    ));
}

#[test]
fn creation_range_includes_tasks_stamped_exactly_on_either_bound() {
    let start = "2025-03-01T00:00:00.000Z";
    let end = "2025-03-31T23:59:59.999Z";
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    store
        .insert_many(
            Collection::Taches,
            vec![
                dated("juste avant", "TODO", "2025-02-28T23:59:59.999Z"),
                dated("au début", "TODO", start),
                dated("à la fin", "TODO", end),
                dated("juste après", "TODO", "2025-04-01T00:00:00.000Z"),
            ],
        )
        .unwrap();
    let service = TaskService::new(store, &CoreConfig::default());

    let filter = TaskFilter {
        status: None,
        created_between: Some((start.to_string(), end.to_string())),
    };
    let page = service.list_tasks(&filter, PageRequest::default()).unwrap();
    let mut titles: Vec<_> = page.items.iter().map(|task| task.titre.as_str()).collect();
    titles.sort_unstable();
    assert_eq!(page.total, 2);
    assert_eq!(titles, vec!["au début", "à la fin"]);
}

#[test]
fn search_projects_matches_title_or_description_literally() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = ProjectService::new(store);
    service
        .create_project(doc(json!({"titre": "Site vitrine", "description": "Refonte"})))
        .unwrap();
    service
        .create_project(doc(json!({"titre": "App", "description": "Version C++ du SITE"})))
        .unwrap();
    service
        .create_project(doc(json!({"titre": "Compta"})))
        .unwrap();

    let found = service.search_projects("site").unwrap();
    let titles: Vec<_> = found.iter().map(|project| project.titre.as_str()).collect();
    assert_eq!(titles, vec!["Site vitrine", "App"]);

    assert_eq!(service.search_projects("c++").unwrap().len(), 1);
    assert!(service.search_projects("   ").unwrap().is_empty());
}

#[test]
fn users_are_created_fetched_and_listed_by_role() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn).unwrap();
    let service = UserService::new(store, &CoreConfig::default());
    let admin = service
        .create_user(doc(json!({"nom": "Ada", "role": "admin"})))
        .unwrap();
    service
        .create_user(doc(json!({"nom": "Bob", "role": "membre"})))
        .unwrap();

    let fetched = service.get_user(&admin.id.to_hex()).unwrap().unwrap();
    assert_eq!(fetched.profile.get("nom"), Some(&json!("Ada")));

    let filter = UserFilter {
        role: Some("admin".to_string()),
    };
    let page = service.list_users(&filter, PageRequest::default()).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, admin.id);

    let err = service
        .create_user(doc(json!({"nom": "Eve", "role": 3})))
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument(_)));
}
