use super::MigrationError;
use crate::sqlite_persistence::Table;
use rusqlite::Connection;
use tracing::info;

/// Installs the partial unique indexes of `table`, all or none.
///
/// Must run after every data pass: rows still violating an index make this fail, and
/// the failure is final for the migration. Indexes that already exist are left as they are.
pub fn finalize_schema(conn: &mut Connection, table: &Table) -> Result<(), MigrationError> {
    let tx = conn.transaction()?;
    for index in table.partial_unique_indices {
        info!("Creating unique index {} on {}", index.name, table.name);
        tx.execute(&index.create_sql(table.name), [])
            .map_err(|source| MigrationError::Finalize {
                index: index.name,
                source,
            })?;
    }
    tx.commit()?;
    Ok(())
}
