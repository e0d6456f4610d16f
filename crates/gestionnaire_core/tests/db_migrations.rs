use gestionnaire_core::db::migrations::latest_version;
use gestionnaire_core::db::{open_db, open_db_in_memory, DbError};
use gestionnaire_core::{Collection, DocumentStore, SqliteDocumentStore, StoreError};
use rusqlite::Connection;
use serde_json::json;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "documents");
    assert!(SqliteDocumentStore::try_new(&conn).is_ok());
}

#[test]
fn opening_same_database_twice_is_idempotent_and_keeps_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gestionnaire.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    let store = SqliteDocumentStore::try_new(&conn_first).unwrap();
    let doc = serde_json::from_value(json!({"titre": "Persisté"})).unwrap();
    let id = store.insert_one(Collection::Projets, doc).unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let store = SqliteDocumentStore::try_new(&conn_second).unwrap();
    assert!(store.find_by_id(Collection::Projets, &id).unwrap().is_some());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn store_refuses_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteDocumentStore::try_new(&conn).err().unwrap();
    assert!(matches!(err, StoreError::SchemaNotReady(_)));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
