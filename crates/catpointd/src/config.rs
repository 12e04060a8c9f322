//! Runtime configuration.
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! store_path = "/var/lib/catpoint/state.json"
//!
//! [classifier]
//! command = "/usr/local/bin/detect-labels"
//! args = ["--format", "json"]
//! timeout_ms = 5000
//! assume_no_cat_on_failure = false
//! ```
//!
//! Every field is optional. The `CATPOINT_STORE` environment variable
//! overrides `store_path`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the store location.
pub const STORE_PATH_ENV: &str = "CATPOINT_STORE";

/// Default classifier timeout.
pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 5_000;

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the JSON state document lives.
    pub store_path: PathBuf,
    pub classifier: ClassifierConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Classifier settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Label-detection program. No classifier when unset.
    pub command: Option<String>,
    pub args: Vec<String>,
    pub timeout_ms: u64,
    /// Treat a failed or timed-out classification as "no cat".
    pub assume_no_cat_on_failure: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_ms: DEFAULT_CLASSIFIER_TIMEOUT_MS,
            assume_no_cat_on_failure: false,
        }
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present, otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::read(&path)?,
                None => {
                    debug!("No config file, using defaults");
                    Self::default()
                }
            },
        };

        if let Ok(store_path) = std::env::var(STORE_PATH_ENV) {
            if !store_path.is_empty() {
                config.store_path = PathBuf::from(store_path);
            }
        }

        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loading config");
        Self::from_toml(&content, path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.classifier.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "classifier.timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self
            .classifier
            .command
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            return Err(ConfigError::Invalid {
                field: "classifier.command",
                reason: "must not be empty".to_string(),
            });
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "store_path",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/catpoint/config.toml` (or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("catpoint").join("config.toml"))
}

/// `$XDG_STATE_HOME/catpoint/state.json`, falling back to `/tmp`.
pub fn default_store_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("catpoint")
        .join("state.json")
}
