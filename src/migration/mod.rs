//! Data migrations that run after a structural schema change.
//!
//! A post-migration walks tables with a keyset cursor, rewriting rows page by page with one
//! transaction per page, and only then tightens the schema. The [`Migrator`] decides when a
//! post-migration runs and records that it completed.

mod aliases;
mod batch;
mod cursor;
mod duplicates;
mod error;
mod finalize;
mod migrator;
mod performers;

pub use aliases::{normalize_alias, normalize_performer_aliases, replace_aliases, AliasOutcome, AliasPass};
pub use batch::{BatchPass, BatchPhase, BatchTransactionRunner};
pub use cursor::{BatchCursor, Keyed, MigrationCursor, Page, DEFAULT_BATCH_SIZE};
pub use duplicates::{next_disambiguation, resolve_duplicate, DuplicatePass};
pub use error::{MigrationError, MigrationStage};
pub use finalize::finalize_schema;
pub use migrator::{MigrationReport, Migrator, SchemaStatus};
pub use performers::normalize_performers;

use rusqlite::Connection;

pub const DEFAULT_LOG_EVERY: u64 = 10_000;

/// Knobs handed to post-migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSettings {
    /// Rows fetched, and committed, per transaction.
    pub batch_size: usize,
    /// A progress line is logged each time this many more rows have been processed.
    pub log_every: u64,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            log_every: DEFAULT_LOG_EVERY,
        }
    }
}

pub type PostMigrationFn = fn(&mut Connection, &MigrationSettings) -> Result<(), MigrationError>;
