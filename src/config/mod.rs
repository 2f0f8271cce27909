mod file_config;

pub use file_config::{FileConfig, MigrationConfig};

use crate::migration::{MigrationSettings, DEFAULT_BATCH_SIZE, DEFAULT_LOG_EVERY};
use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub batch_size: usize,
    pub log_every: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
            log_every: DEFAULT_LOG_EVERY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub migration: MigrationSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified on the command line or in config file")
            })?;

        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let migration_file = file.migration.unwrap_or_default();
        let batch_size = migration_file.batch_size.unwrap_or(cli.batch_size);
        let log_every = migration_file.log_every.unwrap_or(cli.log_every);

        if batch_size == 0 {
            bail!("batch_size must be greater than 0");
        }
        if log_every == 0 {
            bail!("log_every must be greater than 0");
        }

        Ok(Self {
            db_path,
            migration: MigrationSettings {
                batch_size,
                log_every,
            },
        })
    }
}
