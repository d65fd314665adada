use tasklist_core::db::migrations::latest_version;
use tasklist_core::db::{ensure_schema_ready, open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "task_lists");
    assert_table_exists(&conn, "tasks");
    ensure_schema_ready(&conn).unwrap();
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasklist.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "tasks");
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
fn unmigrated_connection_is_not_schema_ready() {
    let conn = Connection::open_in_memory().unwrap();

    match ensure_schema_ready(&conn).unwrap_err() {
        DbError::UninitializedConnection {
            expected_version,
            actual_version,
        } => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_blank_names_and_cascades_deletes() {
    let conn = open_db_in_memory().unwrap();

    let blank = conn.execute(
        "INSERT INTO task_lists (id, name, created_at, is_complete) VALUES ('a', '   ', 0, 0);",
        [],
    );
    assert!(blank.is_err());

    conn.execute(
        "INSERT INTO task_lists (id, name, created_at, is_complete) VALUES ('l', 'Groceries', 0, 0);",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO tasks (id, list_id, name, note, created_at, is_complete)
         VALUES ('t', 'l', 'Milk', '', 0, 0);",
        [],
    )
    .unwrap();
    conn.execute("DELETE FROM task_lists WHERE id = 'l';", [])
        .unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM tasks;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "expected table `{table_name}` to exist");
}
