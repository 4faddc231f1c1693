// ABOUTME: Entry point for the loso binary.
// ABOUTME: Loads .env and LOSO_* configuration, initializes tracing, opens the backend, and runs one command.

mod commands;
mod config;

use anyhow::Context;
use clap::Parser;
use loso_core::{Loso, Storage};
use loso_store::{FileStorage, SqliteStorage};

use crate::commands::Cli;
use crate::config::{BackendKind, LosoConfig};

/// Log filter used when RUST_LOG is not set. Core and backend crates log
/// only warnings, such as index resets.
const DEFAULT_LOG_FILTER: &str = "loso=info,loso_core=warn,loso_store=warn";

fn open_storage(config: &LosoConfig) -> anyhow::Result<Box<dyn Storage>> {
    let path = config.store_path();
    let storage: Box<dyn Storage> = match config.backend {
        BackendKind::File => Box::new(
            FileStorage::open(&path)
                .with_context(|| format!("failed to open file store at {}", path.display()))?,
        ),
        BackendKind::Sqlite => {
            std::fs::create_dir_all(&config.home)
                .with_context(|| format!("failed to create {}", config.home.display()))?;
            Box::new(
                SqliteStorage::open(&path)
                    .with_context(|| format!("failed to open sqlite store at {}", path.display()))?,
            )
        }
    };
    Ok(storage)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let mut config = LosoConfig::from_env()?;
    cli.apply(&mut config);

    tracing::debug!(
        home = %config.home.display(),
        backend = ?config.backend,
        schema_version = %config.schema_version,
        "loaded configuration"
    );

    let storage = open_storage(&config)?;
    let loso = Loso::new(config.schema_version.clone(), storage);

    let mut stdout = std::io::stdout().lock();
    commands::run(&loso, cli.command, &mut stdout)
}
