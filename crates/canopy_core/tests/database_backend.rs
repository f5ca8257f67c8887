//! Database-backend specifics: migrations, NULL content, path limits.

use canopy_core::db::migrations::latest_version;
use canopy_core::{
    open_db_in_memory, CaseSensitivity, DatabaseRepository, DialectId, Repository,
    RepositoryError,
};
use std::sync::Arc;

fn database_repository() -> Repository {
    let conn = open_db_in_memory().unwrap();
    let backend =
        DatabaseRepository::try_new(conn, DialectId::Default, CaseSensitivity::Insensitive)
            .unwrap();
    Repository::new(Arc::new(backend))
}

#[test]
fn migrations_create_object_and_content_tables() {
    let conn = open_db_in_memory().unwrap();

    for table in ["CANOPY_FILES", "CANOPY_FILES_CONTENT"] {
        let exists: i64 = conn
            .query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
                );",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(exists, 1, "table {table} should exist after migrations");
    }

    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
}

#[test]
fn construction_fails_when_tables_are_missing() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let err = DatabaseRepository::try_new(conn, DialectId::Default, CaseSensitivity::Insensitive)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Initialization(_)), "got {err}");
}

#[test]
fn null_content_blob_reads_as_empty_bytes() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO CANOPY_FILES (FILE_PATH, FILE_PARENT, FILE_NAME, FILE_TYPE,
                                   FILE_PERMISSIONS, FILE_CREATED_BY, FILE_CREATED_AT,
                                   FILE_MODIFIED_BY, FILE_MODIFIED_AT)
         VALUES ('/doc.txt', '/', 'doc.txt', 'document', 7, 'seed', 1, 'seed', 1);",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO CANOPY_FILES_CONTENT (FILE_PATH, FILE_CONTENT) VALUES ('/doc.txt', NULL);",
        [],
    )
    .unwrap();

    let backend =
        DatabaseRepository::try_new(conn, DialectId::Default, CaseSensitivity::Insensitive)
            .unwrap();
    let repository = Repository::new(Arc::new(backend));

    let content = repository.resource("/doc.txt").unwrap().content().unwrap();
    assert_eq!(content, Vec::<u8>::new());
}

#[test]
fn missing_content_row_still_reads_as_empty_bytes() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO CANOPY_FILES (FILE_PATH, FILE_PARENT, FILE_NAME, FILE_TYPE,
                                   FILE_PERMISSIONS, FILE_CREATED_BY, FILE_CREATED_AT,
                                   FILE_MODIFIED_BY, FILE_MODIFIED_AT)
         VALUES ('/bare.txt', '/', 'bare.txt', 'document', 7, 'seed', 1, 'seed', 1);",
        [],
    )
    .unwrap();

    let backend =
        DatabaseRepository::try_new(conn, DialectId::Default, CaseSensitivity::Insensitive)
            .unwrap();
    let repository = Repository::new(Arc::new(backend));

    let resource = repository.resource("/bare.txt").unwrap();
    assert_eq!(resource.content().unwrap(), Vec::<u8>::new());
    assert_eq!(resource.information().unwrap().size, 0);
}

#[test]
fn overlong_paths_are_rejected_before_touching_storage() {
    let repository = database_repository();
    let ctx = canopy_core::ActorContext::new("guest1");

    let long_name = "x".repeat(300);
    let resource = repository.resource(&format!("/{long_name}")).unwrap();
    let err = resource.set_content(&ctx, b"too long").unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidPath(_)), "got {err}");
}

#[test]
fn backend_generates_sequence_sql_for_its_dialect() {
    let conn = open_db_in_memory().unwrap();
    let backend =
        DatabaseRepository::try_new(conn, DialectId::Hana, CaseSensitivity::Insensitive).unwrap();

    assert_eq!(backend.dialect(), DialectId::Hana);
    assert_eq!(
        backend.next_value_sql("SEQ_1").unwrap(),
        "SELECT SEQ_1.NEXTVAL FROM DUMMY"
    );
}

#[test]
fn paths_with_like_wildcards_do_not_leak_across_subtrees() {
    let repository = database_repository();
    let ctx = canopy_core::ActorContext::new("guest1");

    repository
        .resource("/a_b/inside.txt")
        .unwrap()
        .create(&ctx, b"inside")
        .unwrap();
    repository
        .resource("/axb/outside.txt")
        .unwrap()
        .create(&ctx, b"outside")
        .unwrap();

    repository.collection("/a_b").unwrap().remove().unwrap();

    assert!(!repository.resource("/a_b/inside.txt").unwrap().exists().unwrap());
    assert!(
        repository.resource("/axb/outside.txt").unwrap().exists().unwrap(),
        "underscore must not act as a wildcard during subtree removal"
    );
}
