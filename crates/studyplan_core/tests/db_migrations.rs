use rusqlite::Connection;
use studyplan_core::db::migrations::{current_version, latest_version};
use studyplan_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn in_memory_database_gets_slot_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "kv_slots");
}

#[test]
fn reopening_file_database_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.db");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO kv_slots (key, value) VALUES ('sample', '{}');",
        [],
    )
    .unwrap();
    drop(conn);

    let reopened = open_db(&path).unwrap();
    assert_eq!(current_version(&reopened).unwrap(), latest_version());
    let value: String = reopened
        .query_row("SELECT value FROM kv_slots WHERE key = 'sample';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(value, "{}");
}

#[test]
fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 42);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_path_is_rejected() {
    assert!(matches!(open_db(""), Err(DbError::EmptyPath)));
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
