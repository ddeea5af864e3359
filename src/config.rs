//! Repository configuration
//!
//! Loaded from YAML; every field has a default so partial files work.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Characters the store rejects in index names
const FORBIDDEN_INDEX_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':'];

/// Repository configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Base URL of the document store
    pub url: String,
    /// Index holding the statements
    pub index: String,
    /// Make each write visible to search before returning (much slower)
    pub refresh: bool,
    /// Scroll page size
    pub batch_size: usize,
    /// How long the store keeps an idle scroll cursor
    pub scroll_keep_alive: String,
    /// Apply changesets in one bulk request when the store supports it
    pub atomic_write: bool,
    /// Reported through the `Validity` feature
    pub with_validity: bool,
    /// Extra delete-by-query passes while `clear` hits version conflicts
    pub clear_retries: u32,
    /// HTTP request timeout
    pub timeout_secs: u64,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: "quadb".to_string(),
            refresh: false,
            batch_size: 1000,
            scroll_keep_alive: "1m".to_string(),
            atomic_write: true,
            with_validity: true,
            clear_retries: 3,
            timeout_secs: 30,
        }
    }
}

impl RepositoryConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive".to_string()));
        }
        if self.index.is_empty() {
            return Err(ConfigError::Invalid("index must not be empty".to_string()));
        }
        if self.index.chars().any(|c| c.is_ascii_uppercase() || FORBIDDEN_INDEX_CHARS.contains(&c))
            || self.index.starts_with(['-', '_', '+'])
        {
            return Err(ConfigError::Invalid(format!("invalid index name: {:?}", self.index)));
        }
        if self.scroll_keep_alive.is_empty() {
            return Err(ConfigError::Invalid("scroll_keep_alive must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
