//! Configuration System
//!
//! Engine defaults loaded from TOML files with environment variable
//! overrides. These defaults fill in whatever a creation request omits;
//! the option validator applies the same contracts to both.

use crate::error::EngineResult;
use crate::series::chunk::{validate_chunk_size, DEFAULT_CHUNK_SIZE_BYTES};
use crate::series::types::{DuplicatePolicy, Encoding, SeriesOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("cannot parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub series: SeriesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults applied to series created without explicit options
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesConfig {
    /// Chunk capacity in bytes when CHUNK_SIZE is omitted
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: usize,

    /// Encoding when ENCODING is omitted
    #[serde(default)]
    pub default_encoding: Encoding,

    /// Collision rule when DUPLICATE_POLICY is omitted
    #[serde(default)]
    pub default_duplicate_policy: DuplicatePolicy,

    /// Retention in milliseconds when RETENTION is omitted; 0 = unbounded
    #[serde(default)]
    pub default_retention_ms: i64,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE_BYTES
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: default_chunk_size(),
            default_encoding: Encoding::default(),
            default_duplicate_policy: DuplicatePolicy::default(),
            default_retention_ms: 0,
        }
    }
}

impl SeriesConfig {
    /// Materialize these defaults as a starting option set
    pub fn default_options(&self) -> SeriesOptions {
        SeriesOptions {
            retention_ms: self.default_retention_ms,
            chunk_size_bytes: self.default_chunk_size,
            encoding: self.default_encoding,
            duplicate_policy: self.default_duplicate_policy,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            error: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var("TEMPO_DEFAULT_CHUNK_SIZE") {
            if let Ok(v) = size.parse() {
                self.series.default_chunk_size = v;
            }
        }
        if let Ok(encoding) = std::env::var("TEMPO_DEFAULT_ENCODING") {
            if let Ok(v) = Encoding::try_from(encoding.as_str()) {
                self.series.default_encoding = v;
            }
        }
        if let Ok(policy) = std::env::var("TEMPO_DEFAULT_DUPLICATE_POLICY") {
            if let Ok(v) = DuplicatePolicy::try_from(policy.as_str()) {
                self.series.default_duplicate_policy = v;
            }
        }
        if let Ok(retention) = std::env::var("TEMPO_DEFAULT_RETENTION_MS") {
            if let Ok(v) = retention.parse() {
                self.series.default_retention_ms = v;
            }
        }
        if let Ok(level) = std::env::var("TEMPO_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Check the configured defaults against the same contracts the
    /// option validator enforces
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(validate_chunk_size(self.series.default_chunk_size as i64))?;
        if self.series.default_retention_ms < 0 {
            return Err(ConfigError::Invalid(
                "default_retention_ms must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn check<T>(result: EngineResult<T>) -> Result<(), ConfigError> {
    result
        .map(|_| ())
        .map_err(|e| ConfigError::Invalid(e.to_string()))
}
