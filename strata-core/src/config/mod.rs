//! Configuration management
//!
//! Environment-based configuration with defaults, optional TOML file
//! loading, and validation. The remote adapter's endpoint and credential
//! are runtime data supplied by the caller, not file configuration.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

mod error;

pub use error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Local store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the persistent store files.
    pub data_dir: PathBuf,

    /// Name of the keyed record store.
    pub store_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            data_dir: PathBuf::from("./data"),
            store_name: crate::store::DEFAULT_STORE_NAME.to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Emit JSON-formatted log lines.
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from `STRATA_`-prefixed environment variables,
    /// falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(dir) = env::var("STRATA_DATA_DIR") {
            config.store.data_dir = PathBuf::from(dir);
        }
        if let Ok(name) = env::var("STRATA_STORE_NAME") {
            config.store.store_name = name;
        }
        if let Ok(level) = env::var("STRATA_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("STRATA_LOG_JSON") {
            config.logging.json_format = json == "1" || json.eq_ignore_ascii_case("true");
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;
        let config: Config =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that the defaults always satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.store_name.is_empty() {
            return Err(ConfigError::InvalidValue(
                "store_name must not be empty".to_string(),
            ));
        }
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "unknown log level '{other}'"
                )))
            }
        }
        Ok(())
    }
}
