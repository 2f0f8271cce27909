//! Keyset pagination over a table in ascending key order.
//!
//! The boundary is explicit state owned by the caller: a page is fetched *after*
//! a [`MigrationCursor`], and the cursor only moves once the page has been committed.

use super::MigrationError;
use rusqlite::{params, Connection, Row};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Position of a pass over a table. Lives only for the duration of the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationCursor {
    pub last_seen_id: i64,
    pub rows_processed: u64,
}

impl Default for MigrationCursor {
    // Rowids may be zero or negative, so the initial boundary sits below every key.
    fn default() -> Self {
        Self {
            last_seen_id: i64::MIN,
            rows_processed: 0,
        }
    }
}

impl MigrationCursor {
    /// Moves the boundary to the last key of a committed page.
    pub fn advance<T: Keyed>(&mut self, page: &Page<T>) {
        if let Some(last) = page.rows.last() {
            self.last_seen_id = last.key();
            self.rows_processed += page.rows.len() as u64;
        }
    }
}

/// A row addressed by the key the cursor pages on.
pub trait Keyed {
    fn key(&self) -> i64;
}

/// Rows of one page, strictly ascending by key and strictly after the cursor that fetched them.
#[derive(Debug)]
pub struct Page<T> {
    rows: Vec<T>,
}

impl<T: Keyed> Page<T> {
    pub fn new(rows: Vec<T>, after: &MigrationCursor) -> Result<Self, MigrationError> {
        let mut previous = after.last_seen_id;
        for row in &rows {
            if row.key() <= previous {
                return Err(MigrationError::CursorOrder {
                    key: row.key(),
                    after: previous,
                });
            }
            previous = row.key();
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A paged query. `sql` must filter on `key > ?1`, order by the key ascending and
/// apply `LIMIT ?2`.
pub struct BatchCursor {
    sql: &'static str,
    page_size: usize,
}

impl BatchCursor {
    pub fn new(sql: &'static str, page_size: usize) -> Self {
        Self {
            sql,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Runs the query for the rows after `cursor`. The caller is in charge of turning
    /// them into a [`Page`], since a page row may be built from several result rows.
    pub fn fetch<T, F>(
        &self,
        conn: &Connection,
        cursor: &MigrationCursor,
        map_row: F,
    ) -> Result<Vec<T>, MigrationError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = conn.prepare_cached(self.sql)?;
        let rows = stmt
            .query_map(params![cursor.last_seen_id, self.page_size as i64], map_row)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }
}
