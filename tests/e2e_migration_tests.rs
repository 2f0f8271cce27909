//! End-to-end tests for upgrading performer databases
//!
//! Every test works on a file-backed database in a temp dir, opening fresh connections the
//! way separate runs of the binary would.

mod common;

use common::*;
use performer_migrate::migration::{
    AliasPass, BatchTransactionRunner, MigrationStage, DEFAULT_BATCH_SIZE,
};
use performer_migrate::performer_store::PERFORMERS_TABLE_V2;
use performer_migrate::{MigrationError, MigrationSettings, PERFORMER_VERSIONED_SCHEMAS};
use rusqlite::Connection;

#[test]
fn test_composite_alias_is_split() {
    let (_dir, db_path) = create_v1_db(&[(1, "Jane", Some(JANE_ALIASES))]).unwrap();

    let report = migrate(&db_path, DEFAULT_BATCH_SIZE).unwrap();

    assert_eq!(report.from_version, Some(1));
    assert_eq!(report.to_version, NORMALIZATION_VERSION);
    assert_eq!(report.post_migrations_run, vec![NORMALIZATION_VERSION]);

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(aliases_of(&conn, 1), vec!["Jane Doe", "J. Doe", "JD"]);
}

#[test]
fn test_atomic_alias_is_left_alone() {
    let (_dir, db_path) = create_v1_db(&[(1, "Solo", Some("Solo"))]).unwrap();

    migrate(&db_path, DEFAULT_BATCH_SIZE).unwrap();

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(aliases_of(&conn, 1), vec!["Solo"]);
}

#[test]
fn test_same_name_performers_are_numbered() {
    let (_dir, db_path) = create_v1_db(&[
        (1, "Alice", None),
        (2, "Alice", None),
        (3, "Alice", None),
        (4, "Bob", None),
    ])
    .unwrap();

    migrate(&db_path, DEFAULT_BATCH_SIZE).unwrap();

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(disambiguation_of(&conn, 1), None);
    assert_eq!(disambiguation_of(&conn, 2), Some("1".to_string()));
    assert_eq!(disambiguation_of(&conn, 3), Some("2".to_string()));
    assert_eq!(disambiguation_of(&conn, 4), None);
    assert_eq!(unique_index_count(&conn), 2);
}

#[test]
fn test_small_pages_give_the_same_result() {
    let performers: Vec<(i64, &str, Option<&str>)> = vec![
        (1, "Alice", Some("Al, Ali")),
        (2, "Bob", Some("Bobby / Rob")),
        (3, "Alice", None),
        (4, "Bob", Some("B")),
        (5, "Alice", Some("A1 / A2 / A1")),
        (6, "Bob", None),
        (7, "Carol", Some("C, , C")),
    ];
    let (_dir, db_path) = create_v1_db(&performers).unwrap();

    migrate(&db_path, SMALL_BATCH_SIZE).unwrap();

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(aliases_of(&conn, 1), vec!["Al", "Ali"]);
    assert_eq!(aliases_of(&conn, 2), vec!["Bobby", "Rob"]);
    assert_eq!(aliases_of(&conn, 4), vec!["B"]);
    assert_eq!(aliases_of(&conn, 5), vec!["A1", "A2"]);
    // Empty pieces are dropped before deduplication
    assert_eq!(aliases_of(&conn, 7), vec!["C"]);

    let numbered: Vec<Option<String>> = (1..=6).map(|id| disambiguation_of(&conn, id)).collect();
    assert_eq!(
        numbered,
        vec![
            None,
            None,
            Some("1".to_string()),
            Some("1".to_string()),
            Some("2".to_string()),
            Some("2".to_string()),
        ]
    );
    assert_eq!(conflicting_pairs(&conn), 0);
}

#[test]
fn test_alias_pass_is_idempotent() {
    let (_dir, db_path) = create_interrupted_v2_db(
        &[(1, "Jane", None), (2, "Solo", None)],
        &[(1, JANE_ALIASES), (2, "Solo")],
    )
    .unwrap();
    let settings = MigrationSettings {
        batch_size: SMALL_BATCH_SIZE,
        ..Default::default()
    };

    let mut conn = Connection::open(&db_path).unwrap();
    let mut first = AliasPass::new(settings.batch_size);
    BatchTransactionRunner::new(&mut conn, &settings)
        .run(&mut first)
        .unwrap();
    let after_first = aliases_of(&conn, 1);

    let mut second = AliasPass::new(settings.batch_size);
    BatchTransactionRunner::new(&mut conn, &settings)
        .run(&mut second)
        .unwrap();

    assert_eq!(first.replaced(), 1);
    assert_eq!(second.replaced(), 0);
    assert_eq!(aliases_of(&conn, 1), after_first);
    assert_eq!(aliases_of(&conn, 2), vec!["Solo"]);
}

#[test]
fn test_existing_duplicate_disambiguation_fails_finalization() {
    let (_dir, db_path) = create_interrupted_v2_db(
        &[
            (1, "Alice", Some("1")),
            (2, "Alice", Some("1")),
            (3, "Alice", None),
            (4, "Alice", None),
        ],
        &[(1, JANE_ALIASES)],
    )
    .unwrap();

    let err = migrate(&db_path, SMALL_BATCH_SIZE).unwrap_err();

    let migration_err = err
        .downcast_ref::<MigrationError>()
        .expect("error carries the migration failure");
    assert_eq!(migration_err.stage(), Some(MigrationStage::SchemaFinalize));
    assert!(matches!(
        migration_err.root(),
        MigrationError::Finalize { .. }
    ));

    // Pages committed by the earlier passes survive the failed finalization
    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(aliases_of(&conn, 1), vec!["Jane Doe", "J. Doe", "JD"]);
    assert_eq!(disambiguation_of(&conn, 3), Some("2".to_string()));
    assert_eq!(disambiguation_of(&conn, 4), Some("3".to_string()));
    assert_eq!(unique_index_count(&conn), 0);

    let status = migrator(SMALL_BATCH_SIZE).status(&conn).unwrap();
    assert_eq!(status.current_version, Some(NORMALIZATION_VERSION));
    assert_eq!(status.pending_post_migrations, vec![NORMALIZATION_VERSION]);
}

#[test]
fn test_resume_after_fixing_conflicting_rows() {
    let (_dir, db_path) = create_interrupted_v2_db(
        &[(1, "Alice", Some("1")), (2, "Alice", Some("1")), (3, "Alice", None)],
        &[],
    )
    .unwrap();
    migrate(&db_path, DEFAULT_BATCH_SIZE).unwrap_err();

    {
        let conn = Connection::open(&db_path).unwrap();
        conn.execute("UPDATE performers SET disambiguation = '7' WHERE id = 2", [])
            .unwrap();
    }

    let report = migrate(&db_path, DEFAULT_BATCH_SIZE).unwrap();

    assert_eq!(report.from_version, Some(NORMALIZATION_VERSION));
    assert_eq!(report.post_migrations_run, vec![NORMALIZATION_VERSION]);
    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(unique_index_count(&conn), 2);
    assert_eq!(conflicting_pairs(&conn), 0);
    assert!(migrator(DEFAULT_BATCH_SIZE)
        .status(&conn)
        .unwrap()
        .is_up_to_date());
}

#[test]
fn test_zero_batch_size_leaves_database_untouched() {
    let (_dir, db_path) = create_v1_db(&[(1, "Jane", Some(JANE_ALIASES))]).unwrap();

    let err = migrate(&db_path, 0).unwrap_err();
    assert!(err.to_string().contains("batch_size must be greater than 0"));

    let conn = Connection::open(&db_path).unwrap();
    let status = migrator(DEFAULT_BATCH_SIZE).status(&conn).unwrap();
    assert_eq!(status.current_version, Some(1));
    assert_eq!(status.pending_post_migrations, vec![NORMALIZATION_VERSION]);

    drop(conn);
    migrate(&db_path, DEFAULT_BATCH_SIZE).unwrap();
    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(aliases_of(&conn, 1), vec!["Jane Doe", "J. Doe", "JD"]);
}

#[test]
fn test_resume_when_indexes_exist_but_completion_was_not_recorded() {
    let (_dir, db_path) = create_interrupted_v2_db(
        &[(1, "Alice", None), (2, "Alice", Some("1")), (3, "Jane", None)],
        &[(3, JANE_ALIASES)],
    )
    .unwrap();
    {
        let conn = Connection::open(&db_path).unwrap();
        for index in PERFORMERS_TABLE_V2.partial_unique_indices {
            conn.execute(&index.create_sql(PERFORMERS_TABLE_V2.name), [])
                .unwrap();
        }
    }

    let report = migrate(&db_path, DEFAULT_BATCH_SIZE).unwrap();

    assert_eq!(report.post_migrations_run, vec![NORMALIZATION_VERSION]);
    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(unique_index_count(&conn), 2);
    assert_eq!(aliases_of(&conn, 3), vec!["Jane Doe", "J. Doe", "JD"]);
    assert!(migrator(DEFAULT_BATCH_SIZE)
        .status(&conn)
        .unwrap()
        .is_up_to_date());
}

#[test]
fn test_non_numeric_disambiguation_is_fatal() {
    let (_dir, db_path) = create_interrupted_v2_db(
        &[(1, "Alice", None), (2, "Alice", Some("live")), (3, "Alice", None)],
        &[],
    )
    .unwrap();

    let err = migrate(&db_path, DEFAULT_BATCH_SIZE).unwrap_err();

    let migration_err = err.downcast_ref::<MigrationError>().unwrap();
    assert_eq!(migration_err.stage(), Some(MigrationStage::DuplicatePass));
    assert!(matches!(
        migration_err.root(),
        MigrationError::InvalidDisambiguation { performer_id: 3, .. }
    ));

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(disambiguation_of(&conn, 3), None);
}

#[test]
fn test_fresh_database_is_created_at_latest_version() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("new.db");

    let report = migrate(&db_path, DEFAULT_BATCH_SIZE).unwrap();
    assert_eq!(report.from_version, None);
    assert!(report.post_migrations_run.is_empty());

    let conn = Connection::open(&db_path).unwrap();
    PERFORMER_VERSIONED_SCHEMAS
        .last()
        .unwrap()
        .validate(&conn)
        .unwrap();
    assert!(migrator(DEFAULT_BATCH_SIZE)
        .status(&conn)
        .unwrap()
        .is_up_to_date());
}

#[test]
fn test_status_before_and_after_upgrade() {
    let (_dir, db_path) = create_v1_db(&[(1, "Alice", None)]).unwrap();

    {
        let conn = Connection::open(&db_path).unwrap();
        let status = migrator(DEFAULT_BATCH_SIZE).status(&conn).unwrap();
        assert_eq!(status.current_version, Some(1));
        assert_eq!(status.latest_version, NORMALIZATION_VERSION);
        assert_eq!(
            status.to_string(),
            "schema version 1 (latest 2), pending post-migrations: 2"
        );
    }

    migrate(&db_path, DEFAULT_BATCH_SIZE).unwrap();
    let second = migrate(&db_path, DEFAULT_BATCH_SIZE).unwrap();
    assert!(second.post_migrations_run.is_empty());

    let conn = Connection::open(&db_path).unwrap();
    let status = migrator(DEFAULT_BATCH_SIZE).status(&conn).unwrap();
    assert_eq!(status.to_string(), "schema version 2 (latest 2)");
}
