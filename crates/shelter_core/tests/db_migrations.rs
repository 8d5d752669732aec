use rusqlite::Connection;
use shelter_core::db::migrations::latest_version;
use shelter_core::db::{open_store, open_store_in_memory, DbError, DEFAULT_BUSY_TIMEOUT};

#[test]
fn open_store_in_memory_applies_all_migrations() {
    let conn = open_store_in_memory(DEFAULT_BUSY_TIMEOUT).unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "documents");
    assert_index_exists(&conn, "idx_documents_collection_seq");
}

#[test]
fn opening_same_store_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("AAC.sqlite3");

    let first = open_store(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    drop(first);

    let second = open_store(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    assert_table_exists(&second, "documents");
}

#[test]
fn opening_store_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_store(&path, DEFAULT_BUSY_TIMEOUT).unwrap_err();
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

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert!(
        sqlite_object_exists(conn, "table", table_name),
        "expected table `{table_name}` to exist"
    );
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    assert!(
        sqlite_object_exists(conn, "index", index_name),
        "expected index `{index_name}` to exist"
    );
}

fn sqlite_object_exists(conn: &Connection, kind: &str, name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2);",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}
