//! Request Limits Module
//!
//! Input checks applied before any backend or cache work:
//! - Query text must contain a non-whitespace character
//! - Query text size
//! - Cache duration range

use std::time::Duration;

use crate::config::LimitsConfig;
use crate::error::{GatewayError, GatewayResult};

/// Request limits configuration
#[derive(Debug, Clone)]
pub struct QueryLimits {
    /// Maximum query text size in bytes (None = unlimited)
    pub max_query_bytes: Option<usize>,

    /// Inclusive bounds for `cache_duration_seconds`
    pub min_cache_ttl_secs: u64,
    pub max_cache_ttl_secs: u64,
}

impl QueryLimits {
    pub fn check_query(&self, query: &str) -> GatewayResult<()> {
        if query.trim().is_empty() {
            return Err(GatewayError::validation("Query cannot be empty"));
        }
        if let Some(limit) = self.max_query_bytes {
            if query.len() > limit {
                return Err(GatewayError::validation(format!(
                    "Query too large: {} bytes, limit {limit} bytes",
                    query.len()
                )));
            }
        }
        Ok(())
    }

    /// Validate a requested cache duration and turn it into a TTL.
    pub fn check_cache_duration(&self, seconds: Option<u64>) -> GatewayResult<Option<Duration>> {
        let Some(seconds) = seconds else {
            return Ok(None);
        };
        if seconds < self.min_cache_ttl_secs || seconds > self.max_cache_ttl_secs {
            return Err(GatewayError::validation(format!(
                "cache_duration_seconds must be between {} and {}, got {seconds}",
                self.min_cache_ttl_secs, self.max_cache_ttl_secs
            )));
        }
        Ok(Some(Duration::from_secs(seconds)))
    }
}

impl From<&LimitsConfig> for QueryLimits {
    fn from(config: &LimitsConfig) -> Self {
        QueryLimits {
            max_query_bytes: (config.max_query_bytes > 0).then_some(config.max_query_bytes),
            min_cache_ttl_secs: config.min_cache_ttl_secs,
            max_cache_ttl_secs: config.max_cache_ttl_secs,
        }
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        QueryLimits::from(&LimitsConfig::default())
    }
}
