//! Reader configuration
//!
//! Loaded from a JSON file or taken from `Default`, then validated once.
//! Immutable after a database is opened with it.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event};

/// Configuration consumed by `Database::open` and `Database::from_buffer`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Read the whole file into heap memory instead of mapping it
    #[serde(default)]
    pub load_into_memory: bool,

    /// Re-digest the body on open and reject a mismatch
    #[serde(default = "default_verify_digest")]
    pub verify_digest: bool,

    /// Scratch bit sets one query may hold at once
    #[serde(default = "default_max_sets_per_query")]
    pub max_sets_per_query: usize,

    /// Scratch bit sets in flight across all queries of one database
    #[serde(default = "default_max_concurrent_sets")]
    pub max_concurrent_sets: usize,
}

fn default_verify_digest() -> bool {
    true
}

fn default_max_sets_per_query() -> usize {
    16
}

fn default_max_concurrent_sets() -> usize {
    1024
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            load_into_memory: false,
            verify_digest: default_verify_digest(),
            max_sets_per_query: default_max_sets_per_query(),
            max_concurrent_sets: default_max_concurrent_sets(),
        }
    }
}

impl ReaderConfig {
    /// Loads and validates a JSON configuration file.
    ///
    /// Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ConfigError::with_source(format!("cannot read {}", path.display()), e)
        })?;
        let config: ReaderConfig = serde_json::from_str(&text).map_err(|e| {
            ConfigError::with_source(format!("cannot parse {}", path.display()), e)
        })?;
        config.validate()?;

        let shown = path.display().to_string();
        let per_query = config.max_sets_per_query.to_string();
        let concurrent = config.max_concurrent_sets.to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("path", shown.as_str()),
                ("load_into_memory", if config.load_into_memory { "true" } else { "false" }),
                ("verify_digest", if config.verify_digest { "true" } else { "false" }),
                ("max_sets_per_query", per_query.as_str()),
                ("max_concurrent_sets", concurrent.as_str()),
            ],
        );
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// - Both quotas must be positive
    /// - One query cannot hold more sets than the whole database allows
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_sets_per_query == 0 {
            return Err(ConfigError::invalid("max_sets_per_query must be positive"));
        }
        if self.max_concurrent_sets == 0 {
            return Err(ConfigError::invalid("max_concurrent_sets must be positive"));
        }
        if self.max_sets_per_query > self.max_concurrent_sets {
            return Err(ConfigError::invalid(format!(
                "max_sets_per_query ({}) exceeds max_concurrent_sets ({})",
                self.max_sets_per_query, self.max_concurrent_sets
            )));
        }
        Ok(())
    }

    /// Returns a copy that reads into heap memory
    pub fn in_memory(mut self) -> Self {
        self.load_into_memory = true;
        self
    }
}

/// Invalid or unreadable configuration
#[derive(Debug)]
pub struct ConfigError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ConfigError {
    /// A configuration value is out of range
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// The configuration file could not be read or parsed
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        "SEAL_CONFIG_INVALID"
    }

    /// Get the message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Configuration errors are never fatal
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code(), self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
