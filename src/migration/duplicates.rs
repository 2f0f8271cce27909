//! Gives every performer that repeats an earlier performer's name a numeric disambiguation.

use super::batch::BatchPass;
use super::cursor::{BatchCursor, MigrationCursor, Page};
use super::MigrationError;
use crate::performer_store::PerformerRecord;
use rusqlite::{params, Connection};
use tracing::info;

// The earliest performer of a name is canonical and never selected.
const DUPLICATE_PAGE_SQL: &str = "
SELECT id, name, disambiguation FROM performers
WHERE disambiguation IS NULL AND id > ?1 AND EXISTS (
    SELECT 1 FROM performers earlier
    WHERE earlier.name = performers.name AND earlier.id < performers.id
)
ORDER BY id
LIMIT ?2";

/// Next disambiguation for `performer`, given the values already assigned to its name.
///
/// The maximum is taken numerically, so "10" follows "9".
pub fn next_disambiguation(
    performer: &PerformerRecord,
    assigned: &[String],
) -> Result<u64, MigrationError> {
    let invalid = |value: &str| MigrationError::InvalidDisambiguation {
        performer_id: performer.id,
        name: performer.name.clone(),
        value: value.to_string(),
    };

    let mut max: Option<u64> = None;
    for value in assigned {
        let numeric: u64 = value.parse().map_err(|_| invalid(value))?;
        max = max.max(Some(numeric));
    }

    match max {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| invalid(&max.to_string())),
    }
}

/// Assigns the next free disambiguation to a duplicate performer and returns it.
pub fn resolve_duplicate(conn: &Connection, performer: &PerformerRecord) -> Result<u64, MigrationError> {
    let mut stmt = conn.prepare_cached(
        "SELECT disambiguation FROM performers WHERE name = ?1 AND disambiguation IS NOT NULL",
    )?;
    let assigned = stmt
        .query_map(params![performer.name], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let disambiguation = next_disambiguation(performer, &assigned)?;

    info!(
        "Adding disambiguation '{}' for performer {:?}",
        disambiguation, performer.name
    );
    conn.execute(
        "UPDATE performers SET disambiguation = ?1 WHERE id = ?2",
        params![disambiguation.to_string(), performer.id],
    )?;
    Ok(disambiguation)
}

pub struct DuplicatePass {
    cursor: BatchCursor,
    assigned: u64,
}

impl DuplicatePass {
    pub fn new(page_size: usize) -> Self {
        Self {
            cursor: BatchCursor::new(DUPLICATE_PAGE_SQL, page_size),
            assigned: 0,
        }
    }

    /// Number of performers that received a disambiguation.
    pub fn assigned(&self) -> u64 {
        self.assigned
    }
}

impl BatchPass for DuplicatePass {
    type Row = PerformerRecord;

    fn name(&self) -> &'static str {
        "duplicate performers"
    }

    fn fetch_page(
        &self,
        conn: &Connection,
        cursor: &MigrationCursor,
    ) -> Result<Page<PerformerRecord>, MigrationError> {
        let performers = self.cursor.fetch(conn, cursor, PerformerRecord::from_row)?;
        Page::new(performers, cursor)
    }

    fn apply(&mut self, conn: &Connection, performer: &PerformerRecord) -> Result<(), MigrationError> {
        resolve_duplicate(conn, performer)?;
        self.assigned += 1;
        Ok(())
    }
}
