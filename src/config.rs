//! JSON file configuration.
//!
//! A configuration file holds two optional sections:
//!
//! ```json
//! {
//!   "executor": { "workers": 8, "max_attempts": 3, "delay_ms": 100 },
//!   "http": { "connect_timeout_secs": 10, "error_for_status": true }
//! }
//! ```
//!
//! Missing sections and fields fall back to their defaults; unknown fields
//! are rejected.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::executor::{ExecutorConfig, ExecutorError};
use crate::transport::HttpClientConfig;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config value: {0}")]
    Invalid(#[from] ExecutorError),
}

/// Combined executor and HTTP client settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub executor: ExecutorConfig,
    pub http: HttpClientConfig,
}

impl Config {
    /// Parses and validates configuration JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown fields and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise the
    /// errors of [`from_json`](Self::from_json).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_json(&raw)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidWorkers`] for an out-of-range pool.
    pub fn validate(&self) -> Result<(), ExecutorError> {
        self.executor.validate()
    }
}
