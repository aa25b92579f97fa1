use stardb_core::db::migrations::latest_version;
use stardb_core::db::{open_db, open_db_in_memory, store_version, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(store_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "collections");
}

#[test]
fn reopening_same_file_keeps_version_and_collections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stardb.sqlite3");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO collections (name, validator) VALUES ('probe', '{}');",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(store_version(&conn).unwrap(), latest_version());
    let registered: i64 = conn
        .query_row("SELECT COUNT(*) FROM collections;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(registered, 1);
}

#[test]
fn opening_store_from_newer_build_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedStoreVersion {
            found,
            latest_supported,
        } => {
            assert_eq!(found, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
