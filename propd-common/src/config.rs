//! Configuration loading and data folder resolution
//!
//! Resolution priority for the database location:
//! 1. Command-line argument (highest priority)
//! 2. `PROPD_DATABASE` environment variable
//! 3. TOML config file (`database` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! Missing config files never abort startup; defaults are applied with a
//! warning instead.

use crate::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Optional TOML configuration file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to the SQLite database file
    pub database: Option<PathBuf>,
    /// Default log level when the CLI does not pass one
    pub log_level: Option<String>,
    /// Default log file when the CLI does not pass one
    pub log_file: Option<PathBuf>,
    /// Rotate the log file when it exceeds this many bytes
    pub log_max_bytes: Option<u64>,
    /// Number of rotated log files to keep
    pub log_backups: Option<usize>,
}

impl TomlConfig {
    /// Load from a TOML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found: {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| crate::Error::Config(format!("{}: {e}", path.display())))
    }
}

/// Resolve the database path from the priority chain
pub fn resolve_database_path(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var("PROPD_DATABASE") {
        return PathBuf::from(path);
    }

    if let Some(path) = &toml_config.database {
        return path.clone();
    }

    default_data_dir().join("propd.db")
}

/// OS-dependent default data folder
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("propd"))
        .unwrap_or_else(|| PathBuf::from("./propd_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_wins() {
        let toml = TomlConfig {
            database: Some(PathBuf::from("/tmp/from-toml.db")),
            ..Default::default()
        };
        let resolved = resolve_database_path(Some(Path::new("/tmp/from-cli.db")), &toml);
        assert_eq!(resolved, PathBuf::from("/tmp/from-cli.db"));
    }

    #[test]
    fn test_missing_config_file_yields_defaults() {
        let cfg = TomlConfig::load(Path::new("/nonexistent/propd.toml")).unwrap();
        assert!(cfg.database.is_none());
        assert!(cfg.log_level.is_none());
    }

    #[test]
    fn test_log_rotation_settings_parse() {
        let cfg: TomlConfig =
            toml::from_str("log_max_bytes = 1048576\nlog_backups = 2\n").unwrap();
        assert_eq!(cfg.log_max_bytes, Some(1_048_576));
        assert_eq!(cfg.log_backups, Some(2));
    }
}
