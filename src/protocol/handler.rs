//! Gateway Handler
//!
//! Request flow: validate -> resolve engine -> cache lookup -> execute ->
//! cache store -> respond. Every request ends in one of four outcomes:
//! validation failure, engine failure, cache hit, or executed.
//!
//! All backend and cache calls are blocking. [`Gateway::run_query`] runs
//! them on the calling thread; [`Gateway::run_query_async`] moves the same
//! sequence onto the blocking worker pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use super::wire::{QueryRequest, QueryResponse};
use crate::backend::{DriverFactory, EnginePool};
use crate::cache::{CacheStats, CachedResult, ResultCache};
use crate::config::Config;
use crate::error::{GatewayError, GatewayResult};
use crate::execution::{self, QueryLimits};

/// Point-in-time gateway counters
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStats {
    pub uptime_secs: u64,
    pub query_count: u64,
    pub executed_count: u64,
    pub failed_count: u64,
    pub pooled_engines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

/// Shared request handler. Holds no per-request state.
pub struct Gateway {
    pool: EnginePool,
    cache: Option<ResultCache>,
    limits: QueryLimits,
    start_time: Instant,
    query_count: AtomicU64,
    executed_count: AtomicU64,
    failed_count: AtomicU64,
}

impl Gateway {
    /// Create a gateway from explicit collaborators.
    pub fn new(pool: EnginePool, cache: Option<ResultCache>, limits: QueryLimits) -> Self {
        Self {
            pool,
            cache,
            limits,
            start_time: Instant::now(),
            query_count: AtomicU64::new(0),
            executed_count: AtomicU64::new(0),
            failed_count: AtomicU64::new(0),
        }
    }

    /// Create a gateway wired to the real drivers and the configured cache store.
    pub fn from_config(config: &Config) -> GatewayResult<Self> {
        let pool = EnginePool::new(Arc::new(DriverFactory::from_config(config)));
        let cache = ResultCache::from_config(&config.cache)?;
        Ok(Self::new(pool, cache, QueryLimits::from(&config.limits)))
    }

    /// Get uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            uptime_secs: self.uptime_seconds(),
            query_count: self.query_count.load(Ordering::Relaxed),
            executed_count: self.executed_count.load(Ordering::Relaxed),
            failed_count: self.failed_count.load(Ordering::Relaxed),
            pooled_engines: self.pool.len(),
            cache: self.cache.as_ref().map(ResultCache::stats),
        }
    }

    /// Run a query on the calling thread. Blocks for connect + execute + cache I/O.
    pub fn run_query(&self, request: &QueryRequest) -> GatewayResult<QueryResponse> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        let result = self.process(request);
        if let Err(e) = &result {
            self.failed_count.fetch_add(1, Ordering::Relaxed);
            if e.is_client_error() {
                tracing::debug!(database = %request.database, error = %e, "query_rejected");
            } else {
                tracing::warn!(database = %request.database, error = %e, "query_failed");
            }
        }
        result
    }

    /// Run a query on the blocking worker pool, leaving the caller's thread free.
    pub async fn run_query_async(
        self: &Arc<Self>,
        request: QueryRequest,
    ) -> GatewayResult<QueryResponse> {
        let gateway = Arc::clone(self);
        tokio::task::spawn_blocking(move || gateway.run_query(&request)).await?
    }

    fn process(&self, request: &QueryRequest) -> GatewayResult<QueryResponse> {
        self.limits.check_query(&request.query)?;
        let ttl = self
            .limits
            .check_cache_duration(request.cache_duration_seconds)?;

        let resolved = self
            .pool
            .resolve(&request.database, &request.database_name)?;
        let engine = Arc::clone(resolved.engine());

        // A cache duration turns on both read and write; no duration means neither.
        let cache = ttl.and_then(|ttl| self.cache.as_ref().map(|cache| (cache, ttl)));
        let key = cache.map(|(cache, _)| {
            cache.key(engine.kind(), &request.database_name, &request.query)
        });

        if let (Some((cache, _)), Some(key)) = (cache, &key) {
            if let Some(hit) = cache.lookup(key) {
                tracing::info!(
                    database = %engine.kind(),
                    rows = hit.data.len(),
                    "query_cache_hit"
                );
                return Ok(QueryResponse {
                    cached: true,
                    time_taken: 0.0,
                    headers: hit.headers,
                    data: hit.data,
                });
            }
        }

        let outcome = execution::execute(engine.as_ref(), &request.query);
        // Engines are kept only once they have reached their database
        if !matches!(outcome, Err(GatewayError::ConnectionAcquisition { .. })) {
            self.pool.admit(&resolved);
        }
        let shaped = outcome?;
        self.executed_count.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            database = %engine.kind(),
            target = %engine.describe(),
            rows = shaped.data.len(),
            elapsed_ms = shaped.elapsed.as_millis() as u64,
            "query_executed"
        );

        let payload = CachedResult {
            headers: shaped.headers,
            data: shaped.data,
        };
        if let (Some((cache, ttl)), Some(key)) = (cache, &key) {
            cache.store(key, &payload, ttl);
        }

        Ok(QueryResponse {
            cached: false,
            time_taken: shaped.elapsed.as_secs_f64(),
            headers: payload.headers,
            data: payload.data,
        })
    }

    /// Drop expired entries from an in-process cache store.
    pub fn purge_expired_cache(&self) -> usize {
        self.cache.as_ref().map_or(0, ResultCache::purge_expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Connection, DatabaseKind, Engine, EngineFactory, Row};
    use crate::cache::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    /// Factory whose engines answer every query with the same rows.
    struct FixedFactory {
        rows: Vec<Row>,
        executions: Arc<AtomicUsize>,
    }

    struct FixedEngine {
        kind: DatabaseKind,
        rows: Vec<Row>,
        executions: Arc<AtomicUsize>,
    }

    struct FixedConnection {
        rows: Vec<Row>,
        executions: Arc<AtomicUsize>,
    }

    impl EngineFactory for FixedFactory {
        fn build(&self, kind: DatabaseKind, _name: &str) -> GatewayResult<Arc<dyn Engine>> {
            Ok(Arc::new(FixedEngine {
                kind,
                rows: self.rows.clone(),
                executions: Arc::clone(&self.executions),
            }))
        }
    }

    impl Engine for FixedEngine {
        fn kind(&self) -> DatabaseKind {
            self.kind
        }
        fn describe(&self) -> String {
            "fixed".to_string()
        }
        fn connect(&self) -> GatewayResult<Box<dyn Connection>> {
            Ok(Box::new(FixedConnection {
                rows: self.rows.clone(),
                executions: Arc::clone(&self.executions),
            }))
        }
    }

    impl Connection for FixedConnection {
        fn query(&mut self, sql: &str) -> GatewayResult<Vec<Row>> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            if sql.contains("FAIL") {
                return Err(GatewayError::execution("division by zero"));
            }
            Ok(self.rows.clone())
        }
    }

    fn x_row() -> Row {
        let mut row = Row::new();
        row.insert("x".to_string(), json!(1));
        row
    }

    fn make_gateway(with_cache: bool) -> (Gateway, Arc<AtomicUsize>) {
        let executions = Arc::new(AtomicUsize::new(0));
        let factory = FixedFactory {
            rows: vec![x_row()],
            executions: Arc::clone(&executions),
        };
        let cache = with_cache.then(|| ResultCache::new(Arc::new(MemoryStore::new()), "test"));
        let gateway = Gateway::new(
            EnginePool::new(Arc::new(factory)),
            cache,
            QueryLimits::default(),
        );
        (gateway, executions)
    }

    #[test]
    fn test_executes_and_shapes() {
        let (gateway, _) = make_gateway(false);
        let req = QueryRequest::new("SELECT 1 AS x", "postgres").with_database_name("testdb");
        let resp = gateway.run_query(&req).unwrap();
        assert!(!resp.cached);
        assert!(resp.time_taken >= 0.0);
        assert_eq!(resp.headers, vec!["x"]);
        assert_eq!(resp.data, vec![x_row()]);
    }

    #[test]
    fn test_empty_query_is_validation_error_without_side_effects() {
        let (gateway, executions) = make_gateway(true);
        let err = gateway
            .run_query(&QueryRequest::new("   ", "postgres"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { .. }));
        assert_eq!(executions.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.stats().pooled_engines, 0);
    }

    #[test]
    fn test_unsupported_backend() {
        let (gateway, executions) = make_gateway(false);
        let err = gateway
            .run_query(&QueryRequest::new("SELECT 1", "mysql"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnsupportedBackend { .. }));
        assert_eq!(executions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_cache_duration_always_executes() {
        let (gateway, executions) = make_gateway(true);
        let req = QueryRequest::new("SELECT 1 AS x", "postgres");
        assert!(!gateway.run_query(&req).unwrap().cached);
        assert!(!gateway.run_query(&req).unwrap().cached);
        assert_eq!(executions.load(Ordering::SeqCst), 2);
        let cache = gateway.stats().cache.unwrap();
        assert_eq!(cache.hits + cache.misses + cache.stores, 0);
    }

    #[test]
    fn test_cache_hit_on_second_request() {
        let (gateway, executions) = make_gateway(true);
        let req = QueryRequest::new("SELECT 1 AS x", "postgres")
            .with_database_name("testdb")
            .with_cache_duration(60);

        let first = gateway.run_query(&req).unwrap();
        let second = gateway.run_query(&req).unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.time_taken, 0.0);
        assert_eq!(first.headers, second.headers);
        assert_eq!(first.data, second.data);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_scoped_by_database_name() {
        let (gateway, executions) = make_gateway(true);
        let a = QueryRequest::new("SELECT 1 AS x", "postgres")
            .with_database_name("a")
            .with_cache_duration(60);
        let b = a.clone().with_database_name("b");

        gateway.run_query(&a).unwrap();
        assert!(!gateway.run_query(&b).unwrap().cached);
        assert_eq!(executions.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_duration_without_store_executes() {
        let (gateway, executions) = make_gateway(false);
        let req = QueryRequest::new("SELECT 1 AS x", "postgres").with_cache_duration(60);
        assert!(!gateway.run_query(&req).unwrap().cached);
        assert!(!gateway.run_query(&req).unwrap().cached);
        assert_eq!(executions.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_duration_out_of_range() {
        let (gateway, _) = make_gateway(true);
        let req = QueryRequest::new("SELECT 1", "postgres").with_cache_duration(5);
        assert!(matches!(
            gateway.run_query(&req),
            Err(GatewayError::Validation { .. })
        ));
    }

    #[test]
    fn test_execution_failure_not_cached() {
        let (gateway, executions) = make_gateway(true);
        let req = QueryRequest::new("SELECT FAIL", "postgres").with_cache_duration(60);
        assert!(matches!(
            gateway.run_query(&req),
            Err(GatewayError::QueryExecution { .. })
        ));
        assert!(gateway.run_query(&req).is_err());
        assert_eq!(executions.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.stats().failed_count, 2);
    }

    #[test]
    fn test_unreachable_database_is_not_pooled() {
        struct RefusingFactory;
        struct RefusingEngine;

        impl EngineFactory for RefusingFactory {
            fn build(&self, _: DatabaseKind, _: &str) -> GatewayResult<Arc<dyn Engine>> {
                Ok(Arc::new(RefusingEngine))
            }
        }

        impl Engine for RefusingEngine {
            fn kind(&self) -> DatabaseKind {
                DatabaseKind::Postgres
            }
            fn describe(&self) -> String {
                "refusing".to_string()
            }
            fn connect(&self) -> GatewayResult<Box<dyn Connection>> {
                Err(GatewayError::ConnectionAcquisition {
                    backend: DatabaseKind::Postgres,
                    reason: "database \"ghost\" does not exist".to_string(),
                })
            }
        }

        let gateway = Gateway::new(
            EnginePool::new(Arc::new(RefusingFactory)),
            None,
            QueryLimits::default(),
        );
        for name in ["ghost_1", "ghost_2", "ghost_3"] {
            let req = QueryRequest::new("SELECT 1", "postgres").with_database_name(name);
            assert!(matches!(
                gateway.run_query(&req),
                Err(GatewayError::ConnectionAcquisition { .. })
            ));
        }
        assert_eq!(gateway.stats().pooled_engines, 0);
    }

    #[test]
    fn test_execution_failure_still_pools_engine() {
        let (gateway, _) = make_gateway(false);
        let _ = gateway.run_query(&QueryRequest::new("SELECT FAIL", "postgres"));
        assert_eq!(gateway.stats().pooled_engines, 1);
    }

    #[test]
    fn test_stats_counts() {
        let (gateway, _) = make_gateway(false);
        gateway
            .run_query(&QueryRequest::new("SELECT 1", "postgres"))
            .unwrap();
        let _ = gateway.run_query(&QueryRequest::new("", "postgres"));
        let stats = gateway.stats();
        assert_eq!(stats.query_count, 2);
        assert_eq!(stats.executed_count, 1);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.pooled_engines, 1);
        assert!(stats.cache.is_none());
    }

    #[tokio::test]
    async fn test_async_path_matches_sync() {
        let (gateway, _) = make_gateway(false);
        let gateway = Arc::new(gateway);
        let req = QueryRequest::new("SELECT 1 AS x", "postgres");
        let resp = gateway.run_query_async(req).await.unwrap();
        assert!(!resp.cached);
        assert_eq!(resp.headers, vec!["x"]);
    }

    #[tokio::test]
    async fn test_async_path_propagates_errors() {
        let (gateway, _) = make_gateway(false);
        let gateway = Arc::new(gateway);
        let err = gateway
            .run_query_async(QueryRequest::new("", "postgres"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { .. }));
    }
}
