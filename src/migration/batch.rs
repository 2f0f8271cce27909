use super::cursor::{Keyed, MigrationCursor, Page};
use super::{MigrationError, MigrationSettings};
use rusqlite::Connection;
use tracing::{debug, info};

/// A full pass over a table, one page at a time.
pub trait BatchPass {
    type Row: Keyed;

    /// Name used in progress logs.
    fn name(&self) -> &'static str;

    fn fetch_page(
        &self,
        conn: &Connection,
        cursor: &MigrationCursor,
    ) -> Result<Page<Self::Row>, MigrationError>;

    fn apply(&mut self, conn: &Connection, row: &Self::Row) -> Result<(), MigrationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    Fetching,
    Applying,
    Committing,
    Aborted,
}

/// Runs each page of a [`BatchPass`] in its own transaction.
///
/// A failing page is rolled back and ends the pass; pages committed before it stay.
pub struct BatchTransactionRunner<'c> {
    conn: &'c mut Connection,
    log_every: u64,
    phase: BatchPhase,
}

impl<'c> BatchTransactionRunner<'c> {
    pub fn new(conn: &'c mut Connection, settings: &MigrationSettings) -> Self {
        Self {
            conn,
            log_every: settings.log_every.max(1),
            phase: BatchPhase::Idle,
        }
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    /// Drives `pass` until the cursor is exhausted and returns the final cursor.
    pub fn run<P: BatchPass>(&mut self, pass: &mut P) -> Result<MigrationCursor, MigrationError> {
        debug_assert_ne!(self.phase, BatchPhase::Aborted, "runner reused after an abort");

        info!("Migrating {}", pass.name());
        let mut cursor = MigrationCursor::default();
        loop {
            match self.run_page(pass, &mut cursor) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    self.phase = BatchPhase::Aborted;
                    return Err(e);
                }
            }
        }
        info!("Migrated {} rows of {}", cursor.rows_processed, pass.name());
        Ok(cursor)
    }

    /// Processes the page after `cursor`. Returns false once there is nothing left.
    fn run_page<P: BatchPass>(
        &mut self,
        pass: &mut P,
        cursor: &mut MigrationCursor,
    ) -> Result<bool, MigrationError> {
        self.phase = BatchPhase::Fetching;
        // Dropping the transaction on any early return rolls the page back.
        let tx = self.conn.transaction()?;
        let page = pass.fetch_page(&tx, cursor)?;
        if page.is_empty() {
            self.phase = BatchPhase::Idle;
            return Ok(false);
        }

        self.phase = BatchPhase::Applying;
        for row in page.rows() {
            pass.apply(&tx, row)?;
        }

        self.phase = BatchPhase::Committing;
        tx.commit()?;

        let before = cursor.rows_processed;
        cursor.advance(&page);
        debug!(
            "Committed {} rows of {} up to key {}",
            page.len(),
            pass.name(),
            cursor.last_seen_id
        );
        if cursor.rows_processed / self.log_every > before / self.log_every {
            info!("Migrated {} rows of {}", cursor.rows_processed, pass.name());
        }

        self.phase = BatchPhase::Idle;
        Ok(true)
    }
}
