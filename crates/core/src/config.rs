//! Configuration management
//!
//! This module handles loading the gscp configuration file.
//! The configuration file is stored in TOML format at
//! `$GSCP_CONFIG_DIR/config.toml`, or `~/.config/gscp/config.toml`.
//!
//! Bump `SCHEMA_VERSION` only together with an upgrade step in `load`.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::StorageConfig;
use crate::transfer::{DEFAULT_BUFFER_SIZE, DEFAULT_TIMEOUT, TransferOptions};

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const ENV_CONFIG_DIR: &str = "GSCP_CONFIG_DIR";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Storage connection settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Default settings for CLI behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Bound on each command in seconds; 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Copy buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Objects requested per listing page
    #[serde(default = "default_page_size")]
    pub page_size: i32,

    /// Show progress bars
    #[serde(default = "default_true")]
    pub progress: bool,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_page_size() -> i32 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            buffer_size: default_buffer_size(),
            page_size: default_page_size(),
            progress: true,
        }
    }
}

impl Defaults {
    /// Operation bound; `None` when `timeout_secs` is 0
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Copy options derived from these defaults
    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            timeout: self.timeout(),
            buffer_size: self.buffer_size.max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(ENV_CONFIG_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("gscp"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// A missing file yields the defaults. Files written by an older release
    /// are upgraded in memory; files from a newer release are rejected.
    pub fn load(&self) -> Result<Config> {
        let content = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut config: Config = toml::from_str(&content)?;
        match config.schema_version.cmp(&SCHEMA_VERSION) {
            Ordering::Less => config.schema_version = SCHEMA_VERSION,
            Ordering::Equal => {}
            Ordering::Greater => {
                return Err(Error::Config(format!(
                    "{} uses schema version {}, newer than supported version {SCHEMA_VERSION}; upgrade gscp",
                    self.config_path.display(),
                    config.schema_version
                )));
            }
        }

        config.storage.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.defaults.timeout_secs, 120);
        assert_eq!(config.defaults.buffer_size, 64 * 1024);
        assert_eq!(config.defaults.page_size, 1000);
        assert!(config.defaults.progress);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_load_full_file() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(
            manager.config_path(),
            r#"
            schema_version = 1

            [defaults]
            timeout_secs = 900

            [storage]
            access_key = "GOOG1EXAMPLE"
            secret_key = "secret"
            "#,
        )
        .unwrap();

        let loaded = manager.load().unwrap();

        assert_eq!(loaded.defaults.timeout_secs, 900);
        assert_eq!(loaded.storage.access_key.as_deref(), Some("GOOG1EXAMPLE"));
        assert_eq!(loaded.storage.secret_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(
            manager.config_path(),
            r#"
            schema_version = 1

            [defaults]
            timeout_secs = 0

            [storage]
            endpoint = "http://localhost:4443"
            "#,
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.defaults.timeout(), None);
        assert_eq!(config.defaults.buffer_size, 64 * 1024);
        assert_eq!(config.storage.endpoint, "http://localhost:4443");
        assert_eq!(config.storage.region, "auto");
    }

    #[test]
    fn test_transfer_options_from_defaults() {
        let defaults = Defaults {
            timeout_secs: 5,
            buffer_size: 0,
            ..Default::default()
        };
        let options = defaults.transfer_options();
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.buffer_size, 1);
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_config_manager();

        let content = format!(
            r#"
            schema_version = {}
            "#,
            SCHEMA_VERSION + 1
        );
        std::fs::write(manager.config_path(), content).unwrap();

        let result = manager.load();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("newer than supported version")
        );
    }

    #[test]
    fn test_invalid_endpoint_rejected_on_load() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(
            manager.config_path(),
            "schema_version = 1\n[storage]\nendpoint = \"::nope\"\n",
        )
        .unwrap();

        assert!(manager.load().is_err());
    }
}
