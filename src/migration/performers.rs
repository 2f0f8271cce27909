use super::aliases::AliasPass;
use super::batch::BatchTransactionRunner;
use super::duplicates::DuplicatePass;
use super::finalize::finalize_schema;
use super::{MigrationError, MigrationSettings, MigrationStage};
use crate::performer_store::PERFORMERS_TABLE_V2;
use rusqlite::Connection;
use tracing::info;

/// Data half of performer schema v2.
///
/// Splits composite aliases, numbers performers whose name repeats an earlier one, then
/// installs the `(name, disambiguation)` and `(name)` unique indexes. Each pass commits
/// page by page; any error ends the run with the stage it happened in.
pub fn normalize_performers(
    conn: &mut Connection,
    settings: &MigrationSettings,
) -> Result<(), MigrationError> {
    let mut stage = MigrationStage::AliasPass;
    info!("Performer normalization: starting {}", stage);
    let mut runner = BatchTransactionRunner::new(conn, settings);
    let mut aliases = AliasPass::new(settings.batch_size);
    runner
        .run(&mut aliases)
        .map_err(|e| e.in_stage(stage))?;

    stage = MigrationStage::DuplicatePass;
    info!("Performer normalization: starting {}", stage);
    let mut duplicates = DuplicatePass::new(settings.batch_size);
    runner
        .run(&mut duplicates)
        .map_err(|e| e.in_stage(stage))?;

    stage = MigrationStage::SchemaFinalize;
    info!("Performer normalization: starting {}", stage);
    finalize_schema(conn, &PERFORMERS_TABLE_V2).map_err(|e| e.in_stage(stage))?;

    stage = MigrationStage::Done;
    info!(
        "Performer normalization {}: rewrote aliases of {} performers, disambiguated {} performers",
        stage,
        aliases.replaced(),
        duplicates.assigned()
    );
    Ok(())
}
