use super::MigrationSettings;
use crate::sqlite_persistence::{VersionedSchema, BASE_DB_VERSION};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt;
use tracing::{info, warn};

/// Bookkeeping table, not part of any versioned schema.
const POST_MIGRATIONS_TABLE: &str = "schema_post_migrations";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStatus {
    /// None for a database without tables.
    pub current_version: Option<usize>,
    pub latest_version: usize,
    /// Versions whose post-migration still has to run, either left over from a failed run
    /// or belonging to a version not applied yet.
    pub pending_post_migrations: Vec<usize>,
}

impl SchemaStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.current_version == Some(self.latest_version) && self.pending_post_migrations.is_empty()
    }
}

impl fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.current_version {
            Some(version) => write!(f, "schema version {}", version)?,
            None => write!(f, "empty database")?,
        }
        write!(f, " (latest {})", self.latest_version)?;
        if !self.pending_post_migrations.is_empty() {
            let pending = self
                .pending_post_migrations
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, ", pending post-migrations: {}", pending)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: Option<usize>,
    pub to_version: usize,
    pub post_migrations_run: Vec<usize>,
}

/// Brings a database up to the last of an ordered list of schema versions.
///
/// Each structural migration commits together with its version stamp. The version's
/// post-migration runs right after, and is recorded as done only once it has finished, so
/// a run that fails halfway resumes the post-migration, and nothing else, next time.
pub struct Migrator {
    schemas: &'static [VersionedSchema],
    settings: MigrationSettings,
}

impl Migrator {
    pub fn new(schemas: &'static [VersionedSchema], settings: MigrationSettings) -> Self {
        Self { schemas, settings }
    }

    fn latest(&self) -> Result<&'static VersionedSchema> {
        self.schemas
            .last()
            .context("No schema versions registered")
    }

    fn read_version(conn: &Connection) -> Result<Option<usize>> {
        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != ?1",
            params![POST_MIGRATIONS_TABLE],
            |r| r.get(0),
        )?;
        if table_count == 0 {
            return Ok(None);
        }

        let raw_version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if raw_version < BASE_DB_VERSION as i64 {
            bail!(
                "Database user_version {} is not a performer schema version",
                raw_version
            );
        }
        Ok(Some((raw_version - BASE_DB_VERSION as i64) as usize))
    }

    fn ensure_post_migrations_table(conn: &Connection) -> Result<()> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (version INTEGER PRIMARY KEY, completed_at TEXT NOT NULL)",
                POST_MIGRATIONS_TABLE
            ),
            [],
        )?;
        Ok(())
    }

    fn completed_post_migrations(conn: &Connection) -> Result<Vec<usize>> {
        let table_exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1",
                params![POST_MIGRATIONS_TABLE],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !table_exists {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT version FROM {} ORDER BY version",
            POST_MIGRATIONS_TABLE
        ))?;
        let versions = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|v| v.map(|v| v as usize))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(versions)
    }

    fn record_post_migration(conn: &Connection, version: usize) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO {} (version, completed_at) VALUES (?1, ?2)",
                POST_MIGRATIONS_TABLE
            ),
            params![version as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn status(&self, conn: &Connection) -> Result<SchemaStatus> {
        let latest_version = self.latest()?.version;
        let current_version = Self::read_version(conn)?;
        let completed = Self::completed_post_migrations(conn)?;

        let pending_post_migrations = match current_version {
            None => Vec::new(),
            Some(_) => self
                .schemas
                .iter()
                .filter(|s| s.post_migration.is_some() && !completed.contains(&s.version))
                .map(|s| s.version)
                .collect(),
        };

        Ok(SchemaStatus {
            current_version,
            latest_version,
            pending_post_migrations,
        })
    }

    fn run_post_migration(
        &self,
        conn: &mut Connection,
        schema: &VersionedSchema,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let Some(post_migration) = schema.post_migration else {
            return Ok(());
        };
        info!("Running post-migration for schema version {}", schema.version);
        post_migration(conn, &self.settings)
            .with_context(|| format!("Post-migration for version {} failed", schema.version))?;
        Self::record_post_migration(conn, schema.version)?;
        report.post_migrations_run.push(schema.version);
        Ok(())
    }

    pub fn run(&self, conn: &mut Connection) -> Result<MigrationReport> {
        // An empty page ends a pass, so a zero page size would skip every row.
        if self.settings.batch_size == 0 {
            bail!("batch_size must be greater than 0");
        }
        conn.pragma_update(None, "foreign_keys", true)?;
        let latest = self.latest()?;

        let Some(current_version) = Self::read_version(conn)? else {
            // Nothing to normalize in a new database, so its post-migrations count as done.
            info!("Creating performer database schema at version {}", latest.version);
            let tx = conn.transaction()?;
            latest.create(&tx)?;
            Self::ensure_post_migrations_table(&tx)?;
            for schema in self.schemas.iter().filter(|s| s.post_migration.is_some()) {
                Self::record_post_migration(&tx, schema.version)?;
            }
            tx.commit()?;
            return Ok(MigrationReport {
                from_version: None,
                to_version: latest.version,
                post_migrations_run: Vec::new(),
            });
        };

        info!(
            "Performer database schema version: {} (target: {})",
            current_version, latest.version
        );
        let index = self
            .schemas
            .iter()
            .position(|s| s.version == current_version)
            .with_context(|| format!("Unknown performer database version {}", current_version))?;

        Self::ensure_post_migrations_table(conn)?;
        let mut report = MigrationReport {
            from_version: Some(current_version),
            to_version: current_version,
            post_migrations_run: Vec::new(),
        };

        let current = &self.schemas[index];
        if current.post_migration.is_some()
            && !Self::completed_post_migrations(conn)?.contains(&current.version)
        {
            warn!(
                "Post-migration for version {} did not complete on a previous run, resuming it",
                current.version
            );
            self.run_post_migration(conn, current, &mut report)?;
        }
        current.validate(conn).with_context(|| {
            format!(
                "Performer database schema validation failed for version {}",
                current.version
            )
        })?;

        let pending = &self.schemas[index + 1..];
        for schema in pending {
            info!(
                "Migrating performer database from version {} to {}",
                report.to_version, schema.version
            );
            let tx = conn.transaction()?;
            if let Some(migration_fn) = schema.migration {
                migration_fn(&tx).with_context(|| {
                    format!("Failed to run migration to version {}", schema.version)
                })?;
            }
            tx.pragma_update(None, "user_version", (BASE_DB_VERSION + schema.version) as i64)?;
            tx.commit()?;
            report.to_version = schema.version;

            self.run_post_migration(conn, schema, &mut report)?;
        }

        #[cfg(not(feature = "no_checks"))]
        if !pending.is_empty() {
            latest
                .validate(conn)
                .context("Performer database schema validation failed after migration")?;
        }

        info!(
            "Performer database schema up to date (version {})",
            report.to_version
        );
        Ok(report)
    }
}
