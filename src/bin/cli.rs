//! subsync CLI
//!
//! Local execution entry point, meant to be run on a schedule.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use subsync::{
    client::{FeedClient, FixtureClient, LiveClient},
    error::Result,
    filter::FilterPolicy,
    models::Config,
    pipeline::RunController,
    storage::{SqliteStore, StateStore},
    utils::time,
};

/// subsync - add new subscription uploads to a playlist, once
#[derive(Parser, Debug)]
#[command(
    name = "subsync",
    version,
    about = "Adds new uploads from your subscriptions to a playlist"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "subsync.toml", env = "SUBSYNC_CONFIG", global = true)]
    config: PathBuf,

    /// SQLite state database (overrides storage.database_path)
    #[arg(long, env = "SUBSYNC_DATABASE", global = true)]
    database: Option<String>,

    /// Use this instant for every feed instead of stored watermarks (RFC 3339 or YYYY-MM-DD)
    #[arg(long, env = "SUBSYNC_PUBLISHED_AFTER", value_parser = parse_instant, global = true)]
    published_after: Option<DateTime<Utc>>,

    /// Run every decision but write nothing, remotely or locally
    #[arg(long, env = "SUBSYNC_DRY_RUN", global = true)]
    dry_run: bool,

    /// Serve remote calls from JSON fixtures in this directory (implies --dry-run)
    #[arg(long, env = "SUBSYNC_FIXTURES", global = true)]
    fixtures: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info", env = "SUBSYNC_LOG_LEVEL", global = true)]
    log_level: String,

    /// Append log output to this file instead of stderr
    #[arg(long, env = "SUBSYNC_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync new items into the playlist (default)
    Run,

    /// Validate configuration and ignore lists
    Validate,

    /// Show cached destination, last run and ledger size
    Info,
}

fn parse_instant(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    time::parse_timestamp(value).map_err(|e| e.to_string())
}

fn open_log_file(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Initialize logging. `RUST_LOG` wins over `level`.
fn init_logging(level: &str, file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();
    if let Some(path) = file {
        builder.target(env_logger::Target::Pipe(Box::new(open_log_file(path)?)));
    }
    builder.init();
    Ok(())
}

/// Load the config file and apply command-line overrides.
///
/// A missing file means defaults; an unreadable one is reported and also
/// falls back to defaults.
fn load_config(cli: &Cli) -> Config {
    let mut config = if cli.config.exists() {
        log::info!("Loading configuration from {}", cli.config.display());
        Config::load_or_default(&cli.config)
    } else {
        log::info!("No config at {}, using defaults", cli.config.display());
        Config::default()
    };

    if let Some(database) = &cli.database {
        config.storage.database_path = database.clone();
    }
    if let Some(ts) = cli.published_after {
        config.sync.published_after = Some(ts);
    }
    if cli.dry_run {
        config.sync.dry_run = true;
    }
    if let Some(dir) = &cli.fixtures {
        config.remote.fixture_dir = Some(dir.clone());
    }
    if config.apply_fixture_mode() {
        log::info!("Fixture mode: running as dry-run, no state is written");
    }
    config
}

fn build_client(config: &Config) -> Result<Box<dyn FeedClient>> {
    match &config.remote.fixture_dir {
        Some(dir) => {
            log::info!("Using fixtures from {}", dir.display());
            Ok(Box::new(FixtureClient::new(dir)))
        }
        None => Ok(Box::new(LiveClient::from_config(&config.remote)?)),
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    init_logging(level, cli.log_file.as_deref())?;

    let config = load_config(&cli);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            config.validate()?;
            let client = build_client(&config)?;
            let store = SqliteStore::open(&config.storage.database_path).await?;

            let report = RunController::new(&config, client.as_ref(), &store)
                .run()
                .await?;
            store.close().await;

            if !report.is_success() {
                log::warn!("Run finished with {} errors", report.stats.errors);
                return Ok(ExitCode::FAILURE);
            }
            log::info!("Done!");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if cli.config.exists() {
                if let Err(e) = Config::load(&cli.config) {
                    log::error!("Config file {} is invalid: {}", cli.config.display(), e);
                    return Err(e);
                }
            }
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            let policy = FilterPolicy::load(&config.filter)?;
            log::info!(
                "✓ Ignore lists OK ({} feeds, {} words, {} items)",
                policy.lists().feeds.len(),
                policy.lists().words.len(),
                policy.lists().items.len()
            );

            match &config.remote.fixture_dir {
                Some(dir) if !dir.is_dir() => {
                    log::error!("Fixture directory {} not found", dir.display());
                    return Ok(ExitCode::FAILURE);
                }
                Some(dir) => log::info!("✓ Fixtures at {}", dir.display()),
                None if std::env::var_os(&config.remote.token_env).is_none() => {
                    log::warn!("{} is not set; live runs will fail", config.remote.token_env);
                }
                None => log::info!("✓ Access token found in {}", config.remote.token_env),
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Database: {}", config.storage.database_path);
            let store = SqliteStore::open(&config.storage.database_path).await?;

            match store.get_channel().await? {
                Some(channel) => log::info!("Channel: {}", channel),
                None => log::info!("Channel: not resolved yet"),
            }
            match store.get_collection().await? {
                Some(collection) => log::info!("Playlist: {}", collection),
                None => log::info!("Playlist: not resolved yet"),
            }
            match store.get_last_run().await? {
                Some(ts) => log::info!("Last successful run: {}", time::format_timestamp(&ts)),
                None => log::info!("No successful run yet."),
            }
            log::info!("Items added so far: {}", store.committed_count().await?);
            store.close().await;
        }
    }

    Ok(ExitCode::SUCCESS)
}
