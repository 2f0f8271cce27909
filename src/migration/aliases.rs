//! Splits composite alias values into one row per alias.

use super::batch::BatchPass;
use super::cursor::{BatchCursor, MigrationCursor, Page};
use super::MigrationError;
use crate::performer_store::{AliasRecord, PerformerAliases};
use rusqlite::{params, Connection};

const ALIAS_DELIMITERS: [char; 2] = [',', '/'];

// Pages over distinct performers so that all alias rows of a performer land in one page.
const ALIAS_PAGE_SQL: &str = "
SELECT performer_id, alias FROM performer_aliases
WHERE performer_id IN (
    SELECT DISTINCT performer_id FROM performer_aliases
    WHERE performer_id > ?1
    ORDER BY performer_id
    LIMIT ?2
)
ORDER BY performer_id, rowid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasOutcome {
    Unchanged,
    Replace(Vec<String>),
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// Normalizes a single raw alias value.
///
/// The value is split on `,` and `/`, pieces are trimmed and empty ones dropped. A value
/// yielding fewer than two pieces is already atomic and left alone, whitespace included.
pub fn normalize_alias(raw: &str) -> AliasOutcome {
    let pieces: Vec<&str> = raw
        .split(ALIAS_DELIMITERS)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect();

    if pieces.len() < 2 {
        return AliasOutcome::Unchanged;
    }

    let mut aliases = Vec::with_capacity(pieces.len());
    for piece in pieces {
        push_unique(&mut aliases, piece);
    }
    AliasOutcome::Replace(aliases)
}

/// Normalizes every alias row of a performer.
///
/// Rows that don't split are carried over as they are; the performer's new set is the
/// deduplicated concatenation of every row's result. Atomic rows repeating an earlier
/// value are dropped as well.
pub fn normalize_performer_aliases(performer: &PerformerAliases) -> AliasOutcome {
    let mut aliases = Vec::with_capacity(performer.aliases.len());
    for raw in &performer.aliases {
        match normalize_alias(raw) {
            AliasOutcome::Unchanged => push_unique(&mut aliases, raw),
            AliasOutcome::Replace(split) => {
                for alias in &split {
                    push_unique(&mut aliases, alias);
                }
            }
        }
    }

    if aliases == performer.aliases {
        AliasOutcome::Unchanged
    } else {
        AliasOutcome::Replace(aliases)
    }
}

/// Replaces the whole alias set of a performer.
pub fn replace_aliases(
    conn: &Connection,
    performer_id: i64,
    aliases: &[String],
) -> Result<(), MigrationError> {
    conn.execute(
        "DELETE FROM performer_aliases WHERE performer_id = ?1",
        params![performer_id],
    )?;
    let mut insert =
        conn.prepare_cached("INSERT INTO performer_aliases (performer_id, alias) VALUES (?1, ?2)")?;
    for alias in aliases {
        insert.execute(params![performer_id, alias])?;
    }
    Ok(())
}

pub struct AliasPass {
    cursor: BatchCursor,
    replaced: u64,
}

impl AliasPass {
    pub fn new(page_size: usize) -> Self {
        Self {
            cursor: BatchCursor::new(ALIAS_PAGE_SQL, page_size),
            replaced: 0,
        }
    }

    /// Number of performers whose alias set was rewritten.
    pub fn replaced(&self) -> u64 {
        self.replaced
    }
}

impl BatchPass for AliasPass {
    type Row = PerformerAliases;

    fn name(&self) -> &'static str {
        "performer aliases"
    }

    fn fetch_page(
        &self,
        conn: &Connection,
        cursor: &MigrationCursor,
    ) -> Result<Page<PerformerAliases>, MigrationError> {
        let records = self.cursor.fetch(conn, cursor, AliasRecord::from_row)?;
        Page::new(PerformerAliases::group(records), cursor)
    }

    fn apply(&mut self, conn: &Connection, performer: &PerformerAliases) -> Result<(), MigrationError> {
        if let AliasOutcome::Replace(aliases) = normalize_performer_aliases(performer) {
            replace_aliases(conn, performer.performer_id, &aliases)?;
            self.replaced += 1;
        }
        Ok(())
    }
}
