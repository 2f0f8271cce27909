use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use performer_migrate::config::{AppConfig, CliConfig, FileConfig};
use performer_migrate::migration::{DEFAULT_BATCH_SIZE, DEFAULT_LOG_EVERY};
use performer_migrate::{Migrator, PERFORMER_VERSIONED_SCHEMAS};
use rusqlite::Connection;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
struct CliArgs {
    /// Path to the SQLite performer database file.
    #[clap(value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Its values take precedence over the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Number of rows processed per transaction.
    #[clap(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Log progress every time this many more rows have been processed.
    #[clap(long, default_value_t = DEFAULT_LOG_EVERY)]
    pub log_every: u64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Brings the database up to the latest schema version (default).
    Migrate,

    /// Shows the schema version and pending post-migrations without changing anything.
    Status,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        db_path: cli_args.db_path.clone(),
        batch_size: cli_args.batch_size,
        log_every: cli_args.log_every,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening performer database at {:?}...", config.db_path);
    let mut conn = Connection::open(&config.db_path)
        .with_context(|| format!("Failed to open performer database {:?}", config.db_path))?;
    let migrator = Migrator::new(PERFORMER_VERSIONED_SCHEMAS, config.migration);

    match cli_args.command.unwrap_or(Command::Migrate) {
        Command::Migrate => {
            let report = migrator.run(&mut conn)?;
            match report.from_version {
                Some(from) if from == report.to_version && report.post_migrations_run.is_empty() => {
                    info!("Nothing to do, database is at version {}", report.to_version)
                }
                Some(from) => info!(
                    "Migrated performer database from version {} to {}, post-migrations run: {:?}",
                    from, report.to_version, report.post_migrations_run
                ),
                None => info!(
                    "Created performer database at version {}",
                    report.to_version
                ),
            }
        }
        Command::Status => {
            let status = migrator.status(&conn)?;
            println!("{}", status);
            if !status.is_up_to_date() {
                println!("Run `migrate` to bring the database up to date.");
            }
        }
    }

    Ok(())
}
