//! Performer database migrations.
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod migration;
pub mod performer_store;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use migration::{MigrationError, MigrationReport, MigrationSettings, Migrator, SchemaStatus};
pub use performer_store::PERFORMER_VERSIONED_SCHEMAS;
