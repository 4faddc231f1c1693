// ABOUTME: Configuration loading for the loso command-line tool.
// ABOUTME: Reads LOSO_* environment variables with defaults and resolves the backend file location.

use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("LOSO_BACKEND must be \"file\" or \"sqlite\", got {0:?}")]
    InvalidBackend(String),

    #[error("LOSO_SCHEMA_VERSION must not be empty")]
    EmptySchemaVersion,
}

/// Which durable backend the tool stores entries in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    File,
    Sqlite,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(BackendKind::File),
            "sqlite" => Ok(BackendKind::Sqlite),
            _ => Err(ConfigError::InvalidBackend(s.to_string())),
        }
    }
}

/// Tool configuration.
#[derive(Debug, Clone)]
pub struct LosoConfig {
    pub home: PathBuf,
    pub backend: BackendKind,
    pub schema_version: String,
}

impl LosoConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// Environment variables:
    /// - LOSO_HOME: data directory (default: ~/.loso)
    /// - LOSO_BACKEND: `file` or `sqlite` (default: file)
    /// - LOSO_SCHEMA_VERSION: version stamped on writes (default: 0.0.1)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("LOSO_HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                lookup("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".loso")
            });

        let backend = match lookup("LOSO_BACKEND").filter(|b| !b.is_empty()) {
            Some(raw) => raw.parse()?,
            None => BackendKind::File,
        };

        let schema_version = match lookup("LOSO_SCHEMA_VERSION") {
            Some(v) if v.trim().is_empty() => return Err(ConfigError::EmptySchemaVersion),
            Some(v) => v,
            None => "0.0.1".to_string(),
        };

        Ok(Self {
            home,
            backend,
            schema_version,
        })
    }

    /// Path of the backend's data file inside the home directory.
    pub fn store_path(&self) -> PathBuf {
        match self.backend {
            BackendKind::File => self.home.join("store.json"),
            BackendKind::Sqlite => self.home.join("store.db"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn config_loads_defaults() {
        let config = LosoConfig::from_lookup(lookup_from(&[("HOME", "/home/tester")])).unwrap();

        assert_eq!(config.home, PathBuf::from("/home/tester/.loso"));
        assert_eq!(config.backend, BackendKind::File);
        assert_eq!(config.schema_version, "0.0.1");
        assert_eq!(config.store_path(), PathBuf::from("/home/tester/.loso/store.json"));
    }

    #[test]
    fn config_falls_back_to_tmp_without_home() {
        let config = LosoConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.home, PathBuf::from("/tmp/.loso"));
    }

    #[test]
    fn config_reads_overrides() {
        let config = LosoConfig::from_lookup(lookup_from(&[
            ("LOSO_HOME", "/data/loso"),
            ("LOSO_BACKEND", "SQLite"),
            ("LOSO_SCHEMA_VERSION", "v2"),
        ]))
        .unwrap();

        assert_eq!(config.home, PathBuf::from("/data/loso"));
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.schema_version, "v2");
        assert_eq!(config.store_path(), PathBuf::from("/data/loso/store.db"));
    }

    #[test]
    fn config_rejects_unknown_backend() {
        let err = LosoConfig::from_lookup(lookup_from(&[("LOSO_BACKEND", "redis")])).unwrap_err();
        assert!(
            err.to_string().contains("LOSO_BACKEND"),
            "error should name the variable: {}",
            err
        );
    }

    #[test]
    fn backend_names_match_cli_values() {
        assert_eq!("file".parse::<BackendKind>().unwrap(), BackendKind::File);
        assert_eq!("sqlite".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert!("json".parse::<BackendKind>().is_err());

        for kind in BackendKind::value_variants() {
            let name = kind.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(name.parse::<BackendKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn config_rejects_blank_schema_version() {
        let result = LosoConfig::from_lookup(lookup_from(&[("LOSO_SCHEMA_VERSION", "  ")]));
        assert!(matches!(result, Err(ConfigError::EmptySchemaVersion)));
    }
}
