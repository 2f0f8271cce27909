//! Test fixture creation for performer databases

#![allow(dead_code)]

use super::constants::NORMALIZATION_VERSION;
use anyhow::{Context, Result};
use performer_migrate::sqlite_persistence::BASE_DB_VERSION;
use performer_migrate::{MigrationReport, MigrationSettings, Migrator, PERFORMER_VERSIONED_SCHEMAS};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// (id, name, raw aliases) of a version 1 performer.
pub type V1Performer<'a> = (i64, &'a str, Option<&'a str>);

/// (id, name, disambiguation) of a version 2 performer.
pub type V2Performer<'a> = (i64, &'a str, Option<&'a str>);

/// Creates a database at schema version 1.
/// Returns (temp_dir, db_path); the database lives as long as temp_dir.
pub fn create_v1_db(performers: &[V1Performer]) -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("performers.db");

    let conn = Connection::open(&db_path)?;
    PERFORMER_VERSIONED_SCHEMAS[0].create(&conn)?;
    for (id, name, aliases) in performers {
        conn.execute(
            "INSERT INTO performers (id, name, aliases) VALUES (?1, ?2, ?3)",
            params![id, name, aliases],
        )?;
    }

    Ok((dir, db_path))
}

/// Creates a database whose structural change to version 2 is committed but whose
/// post-migration never completed, as left behind by an interrupted upgrade.
///
/// Performers are inserted with their disambiguation as given, and `aliases` as raw rows.
pub fn create_interrupted_v2_db(
    performers: &[V2Performer],
    aliases: &[(i64, &str)],
) -> Result<(TempDir, PathBuf)> {
    let (dir, db_path) = create_v1_db(&[])?;

    let mut conn = Connection::open(&db_path)?;
    let tx = conn.transaction()?;
    let migration = PERFORMER_VERSIONED_SCHEMAS[NORMALIZATION_VERSION - 1]
        .migration
        .context("version 2 has a structural migration")?;
    migration(&tx)?;
    tx.pragma_update(
        None,
        "user_version",
        (BASE_DB_VERSION + NORMALIZATION_VERSION) as i64,
    )?;
    for (id, name, disambiguation) in performers {
        tx.execute(
            "INSERT INTO performers (id, name, disambiguation) VALUES (?1, ?2, ?3)",
            params![id, name, disambiguation],
        )?;
    }
    for (performer_id, alias) in aliases {
        tx.execute(
            "INSERT INTO performer_aliases (performer_id, alias) VALUES (?1, ?2)",
            params![performer_id, alias],
        )?;
    }
    tx.commit()?;

    Ok((dir, db_path))
}

pub fn migrator(batch_size: usize) -> Migrator {
    Migrator::new(
        PERFORMER_VERSIONED_SCHEMAS,
        MigrationSettings {
            batch_size,
            ..Default::default()
        },
    )
}

/// Opens the database and runs every pending migration.
pub fn migrate(db_path: &Path, batch_size: usize) -> Result<MigrationReport> {
    let mut conn = Connection::open(db_path)?;
    migrator(batch_size).run(&mut conn)
}

pub fn aliases_of(conn: &Connection, performer_id: i64) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT alias FROM performer_aliases WHERE performer_id = ?1 ORDER BY rowid")
        .unwrap();
    stmt.query_map([performer_id], |row| row.get(0))
        .unwrap()
        .collect::<rusqlite::Result<Vec<String>>>()
        .unwrap()
}

pub fn disambiguation_of(conn: &Connection, performer_id: i64) -> Option<String> {
    conn.query_row(
        "SELECT disambiguation FROM performers WHERE id = ?1",
        [performer_id],
        |row| row.get(0),
    )
    .unwrap()
}

/// Number of pairs of performers that the unique indexes would reject.
pub fn conflicting_pairs(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM performers a JOIN performers b
         ON a.name = b.name AND a.id < b.id
         AND (a.disambiguation = b.disambiguation
              OR (a.disambiguation IS NULL AND b.disambiguation IS NULL))",
        [],
        |row| row.get(0),
    )
    .unwrap()
}

pub fn unique_index_count(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='index'
         AND name IN ('performers_name_disambiguation_unique', 'performers_name_unique')",
        [],
        |row| row.get(0),
    )
    .unwrap()
}
