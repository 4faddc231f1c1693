// ABOUTME: Command-line surface of the loso tool: argument parsing and command execution.
// ABOUTME: Each subcommand maps onto one facade operation and writes its result to the given output.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use loso_core::{Entry, Loso, Storage};

use crate::config::{BackendKind, LosoConfig};

#[derive(Debug, Parser)]
#[command(name = "loso", version, about = "Versioned key-value store with per-key metadata")]
pub struct Cli {
    /// Data directory (overrides LOSO_HOME)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Storage backend (overrides LOSO_BACKEND)
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Schema version stamped on writes (overrides LOSO_SCHEMA_VERSION)
    #[arg(long, global = true)]
    pub schema_version: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Apply command-line overrides on top of environment configuration.
    pub fn apply(&self, config: &mut LosoConfig) {
        if let Some(home) = &self.home {
            config.home = home.clone();
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(version) = &self.schema_version {
            config.schema_version = version.clone();
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the value stored under a key
    Get { key: String },

    /// Store a value under a key
    Set {
        key: String,
        value: String,
        /// Parse the value as JSON instead of storing it as raw text
        #[arg(long)]
        json: bool,
    },

    /// Remove a key and its metadata
    Remove { key: String },

    /// List tracked keys with their metadata
    Keys,

    /// Print the index record
    Index {
        #[arg(long, value_enum, default_value_t = IndexFormat::Json)]
        format: IndexFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexFormat {
    Json,
    Yaml,
}

/// Run one command against `loso`, writing human-readable output to `out`.
pub fn run<S: Storage>(loso: &Loso<S>, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Get { key } => match loso.get(&key)? {
            Some(Entry::Text(text)) => writeln!(out, "{}", text)?,
            Some(Entry::Json(value)) => writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?,
            None => bail!("key not found: {}", key),
        },
        Command::Set { key, value, json } => {
            if json {
                let parsed: serde_json::Value = serde_json::from_str(&value)
                    .with_context(|| format!("value for {key:?} is not valid json"))?;
                loso.set(&key, parsed)?;
            } else {
                loso.set(&key, value)?;
            }
            tracing::info!(key = %key, version = %loso.version(), "stored");
        }
        Command::Remove { key } => {
            loso.remove(&key)?;
            tracing::info!(key = %key, "removed");
        }
        Command::Keys => {
            let index = loso.index()?;
            for (key, meta) in &index.configs {
                let encoding = if meta.string_type { "text" } else { "json" };
                write!(out, "{}\t{}\t{}\t{}", key, meta.version, meta.updated_time, encoding)?;
                if meta.version != loso.version() {
                    write!(out, "\toutdated")?;
                }
                writeln!(out)?;
            }
        }
        Command::Index { format } => {
            let index = loso.index()?;
            match format {
                IndexFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&index)?)?,
                IndexFormat::Yaml => write!(out, "{}", serde_yaml::to_string(&index)?)?,
            }
        }
    }
    Ok(())
}
