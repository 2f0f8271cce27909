//! Schema history of the performer database.
//!
//! Version 1 keeps every alias of a performer in one free-form `aliases` column.
//! Version 2 moves aliases to their own table, adds `disambiguation`, and makes
//! `(name, disambiguation)` unique once the data has been normalized.

use crate::migration::normalize_performers;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    ForeignKey, PartialUniqueIndex, SqlType, Table, VersionedSchema,
};
use anyhow::Result;
use rusqlite::Connection;

pub const PERFORMERS_TABLE_V1: Table = Table {
    name: "performers",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("aliases", &SqlType::Text), // comma or slash separated
    ],
    indices: &[("idx_performers_name", "name")],
    partial_unique_indices: &[],
};

pub const PERFORMERS_TABLE_V2: Table = Table {
    name: "performers",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("disambiguation", &SqlType::Text),
    ],
    indices: &[("idx_performers_name", "name")],
    partial_unique_indices: &[
        PartialUniqueIndex {
            name: "performers_name_disambiguation_unique",
            columns: &["name", "disambiguation"],
            condition: "disambiguation IS NOT NULL",
        },
        PartialUniqueIndex {
            name: "performers_name_unique",
            columns: &["name"],
            condition: "disambiguation IS NULL",
        },
    ],
};

pub const PERFORMER_ALIASES_TABLE_V2: Table = Table {
    name: "performer_aliases",
    columns: &[
        sqlite_column!(
            "performer_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "performers",
                foreign_column: "id",
            })
        ),
        sqlite_column!("alias", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_performer_aliases_performer_id", "performer_id")],
    partial_unique_indices: &[],
};

/// Structural half of v2. The unique indexes are left to [`normalize_performers`], since
/// existing rows can't satisfy them yet.
fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
    PERFORMER_ALIASES_TABLE_V2.create(conn)?;
    conn.execute(
        "INSERT INTO performer_aliases (performer_id, alias)
         SELECT id, aliases FROM performers
         WHERE aliases IS NOT NULL AND TRIM(aliases) != ''
         ORDER BY id",
        [],
    )?;
    conn.execute("ALTER TABLE performers DROP COLUMN aliases", [])?;
    conn.execute("ALTER TABLE performers ADD COLUMN disambiguation TEXT", [])?;
    Ok(())
}

/// All versioned schemas of the performer database, oldest first.
pub const PERFORMER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[PERFORMERS_TABLE_V1],
        migration: None,
        post_migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[PERFORMERS_TABLE_V2, PERFORMER_ALIASES_TABLE_V2],
        migration: Some(migrate_v1_to_v2),
        post_migration: Some(normalize_performers),
    },
];
