//! Loader configuration
//!
//! Values come from `LoaderConfig::default()`, the builder setters, or the
//! environment via [`LoaderConfig::from_env`].

use std::env;

use crate::error::ModelError;
use crate::query::MAX_BIND_PARAMS;

/// Leaves 535 of the statement's bind parameters to scope conditions
const DEFAULT_MAX_PARENT_KEYS: usize = 65_000;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {field}: expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Configuration(err.to_string())
    }
}

/// Configuration for aggregate loading
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Run independent loaders of one batch concurrently
    pub parallel_execution: bool,
    /// Largest number of distinct parent keys a single load may send.
    /// Larger batches fail instead of being split. Scope conditions bind
    /// parameters too; a query over [`MAX_BIND_PARAMS`] in total fails
    /// whatever this limit says.
    pub max_parent_keys: usize,
    /// Emit every rendered aggregate query at debug level; read by
    /// `PgAggregateStore::with_config`
    pub log_queries: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            parallel_execution: true,
            max_parent_keys: DEFAULT_MAX_PARENT_KEYS,
            log_queries: false,
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallel_execution(mut self, parallel: bool) -> Self {
        self.parallel_execution = parallel;
        self
    }

    pub fn with_max_parent_keys(mut self, max: usize) -> Self {
        self.max_parent_keys = max;
        self
    }

    pub fn with_log_queries(mut self, log_queries: bool) -> Self {
        self.log_queries = log_queries;
        self
    }

    /// Load configuration from `ELIF_LOADER_*` environment variables,
    /// falling back to defaults for anything unset
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Ok(value) = env::var("ELIF_LOADER_PARALLEL") {
            config.parallel_execution = parse_bool("ELIF_LOADER_PARALLEL", value)?;
        }

        if let Ok(value) = env::var("ELIF_LOADER_MAX_PARENT_KEYS") {
            config.max_parent_keys = value.parse().map_err(|_| ConfigError::InvalidValue {
                field: "ELIF_LOADER_MAX_PARENT_KEYS".to_string(),
                value,
                expected: "positive integer".to_string(),
            })?;
        }

        if let Ok(value) = env::var("ELIF_LOADER_LOG_QUERIES") {
            config.log_queries = parse_bool("ELIF_LOADER_LOG_QUERIES", value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parent_keys == 0 {
            return Err(ConfigError::ValidationFailed {
                message: "max_parent_keys must be greater than zero".to_string(),
            });
        }

        if self.max_parent_keys > MAX_BIND_PARAMS {
            return Err(ConfigError::ValidationFailed {
                message: format!(
                    "max_parent_keys must not exceed {} bind parameters",
                    MAX_BIND_PARAMS
                ),
            });
        }

        Ok(())
    }
}

fn parse_bool(field: &str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            expected: "boolean (true/false)".to_string(),
        }),
    }
}
