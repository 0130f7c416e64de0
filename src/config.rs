use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Engine limits and defaults with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Abort MATCH when a cross-product would exceed this many rows
    #[validate(range(min = 1, message = "Cartesian product limit must be positive"))]
    pub max_cartesian_product_results: usize,

    /// Depth cap shared by the traverser and variable-length patterns
    #[validate(range(
        min = 1,
        max = 100,
        message = "Max traversal depth must be between 1 and 100"
    ))]
    pub max_traversal_depth: u32,

    /// Queries longer than this many bytes are rejected before parsing
    #[validate(range(min = 1, message = "Max query length must be positive"))]
    pub max_query_length: usize,

    /// Default query timeout in seconds when the caller supplies none
    #[validate(range(min = 1, message = "Default query timeout must be positive"))]
    pub default_query_timeout_secs: u64,

    /// Hard upper bound for query timeouts (5 minutes)
    #[validate(range(min = 1, message = "Max query timeout must be positive"))]
    pub max_query_timeout_secs: u64,

    /// Lower bound for background task timeouts
    #[validate(range(min = 1, message = "Min task timeout must be positive"))]
    pub min_task_timeout_secs: u64,

    /// Default k for the vector-search plan rewrite
    #[validate(range(min = 1, message = "Vector search k must be positive"))]
    pub vector_search_k: usize,

    /// Default ef for the vector-search plan rewrite
    #[validate(range(min = 1, message = "Vector search ef must be positive"))]
    pub vector_search_ef: usize,

    /// Whether compiled plans are cached
    pub plan_cache_enabled: bool,

    /// Bounded plan cache size (LRU eviction)
    #[validate(range(min = 1, message = "Plan cache size must be positive"))]
    pub plan_cache_max_entries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cartesian_product_results: 1_000_000,
            max_traversal_depth: 100,
            max_query_length: 10_000,
            default_query_timeout_secs: 30,
            max_query_timeout_secs: 300,
            min_task_timeout_secs: 1,
            vector_search_k: 64,
            vector_search_ef: 128,
            plan_cache_enabled: true,
            plan_cache_max_entries: 1000,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            max_cartesian_product_results: parse_env_var(
                "QUIVER_MAX_CARTESIAN_PRODUCT_RESULTS",
                &defaults.max_cartesian_product_results.to_string(),
            )?,
            max_traversal_depth: parse_env_var(
                "QUIVER_MAX_TRAVERSAL_DEPTH",
                &defaults.max_traversal_depth.to_string(),
            )?,
            max_query_length: parse_env_var(
                "QUIVER_MAX_QUERY_LENGTH",
                &defaults.max_query_length.to_string(),
            )?,
            default_query_timeout_secs: parse_env_var(
                "QUIVER_DEFAULT_QUERY_TIMEOUT_SECS",
                &defaults.default_query_timeout_secs.to_string(),
            )?,
            max_query_timeout_secs: parse_env_var(
                "QUIVER_MAX_QUERY_TIMEOUT_SECS",
                &defaults.max_query_timeout_secs.to_string(),
            )?,
            min_task_timeout_secs: parse_env_var(
                "QUIVER_MIN_TASK_TIMEOUT_SECS",
                &defaults.min_task_timeout_secs.to_string(),
            )?,
            vector_search_k: parse_env_var(
                "QUIVER_VECTOR_SEARCH_K",
                &defaults.vector_search_k.to_string(),
            )?,
            vector_search_ef: parse_env_var(
                "QUIVER_VECTOR_SEARCH_EF",
                &defaults.vector_search_ef.to_string(),
            )?,
            plan_cache_enabled: parse_env_var("QUIVER_PLAN_CACHE_ENABLED", "true")?,
            plan_cache_max_entries: parse_env_var(
                "QUIVER_PLAN_CACHE_MAX_ENTRIES",
                &defaults.plan_cache_max_entries.to_string(),
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn default_query_timeout(&self) -> Duration {
        Duration::from_secs(self.default_query_timeout_secs)
    }

    pub fn max_query_timeout(&self) -> Duration {
        Duration::from_secs(self.max_query_timeout_secs)
    }

    pub fn min_task_timeout(&self) -> Duration {
        Duration::from_secs(self.min_task_timeout_secs)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_cartesian_product_results, 1_000_000);
        assert_eq!(config.max_traversal_depth, 100);
        assert_eq!(config.default_query_timeout_secs, 30);
        assert_eq!(config.max_query_timeout_secs, 300);
    }

    #[test]
    fn test_invalid_traversal_depth() {
        let config = EngineConfig {
            max_traversal_depth: 101, // Invalid (> 100)
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cache_size() {
        let config = EngineConfig {
            plan_cache_max_entries: 0, // Invalid
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
