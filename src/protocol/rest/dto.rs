//! REST API Data Transfer Objects
//!
//! Response types for the admin endpoints. Query bodies live in
//! [`crate::protocol::wire`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::cache::CacheStats;
use crate::protocol::GatewayStats;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthDto {
    pub status: String,
}

impl HealthDto {
    pub fn ok() -> Self {
        HealthDto {
            status: "ok".to_string(),
        }
    }
}

/// Cache counters
#[derive(Debug, Serialize, ToSchema)]
pub struct CacheStatsDto {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub store_failures: u64,
    pub lookup_failures: u64,
    pub hit_rate: f64,
}

impl From<CacheStats> for CacheStatsDto {
    fn from(stats: CacheStats) -> Self {
        CacheStatsDto {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            stores: stats.stores,
            store_failures: stats.store_failures,
            lookup_failures: stats.lookup_failures,
        }
    }
}

/// Server statistics response
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsDto {
    pub version: String,
    pub uptime_secs: u64,
    pub query_count: u64,
    pub executed_count: u64,
    pub failed_count: u64,
    pub pooled_engines: usize,
    /// Absent when caching is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStatsDto>,
}

impl From<GatewayStats> for StatsDto {
    fn from(stats: GatewayStats) -> Self {
        StatsDto {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: stats.uptime_secs,
            query_count: stats.query_count,
            executed_count: stats.executed_count,
            failed_count: stats.failed_count,
            pooled_engines: stats.pooled_engines,
            cache: stats.cache.map(CacheStatsDto::from),
        }
    }
}
