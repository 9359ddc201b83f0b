//! Result Cache Module
//!
//! Caches shaped query results in an external key-value store.
//!
//! ## Design
//!
//! - Keys are scoped by backend, database name and query text with whitespace
//!   outside quotes normalized, then hashed, so the same text against two databases never collides.
//! - Values are JSON `{headers, data}`; entries expire by TTL only.
//! - Every store failure is logged and counted, never returned: a broken cache
//!   degrades to "no cache".

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::backend::{DatabaseKind, Row};
use crate::config::{CacheBackend, CacheConfig};
use crate::error::GatewayResult;

/// Key-value store with per-entry expiry.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> GatewayResult<Option<String>>;

    fn set(&self, key: &str, value: &str, ttl: Duration) -> GatewayResult<()>;

    /// Drop expired entries. Stores with native expiry do nothing.
    fn purge_expired(&self) -> usize {
        0
    }
}

/// Cache key for one query against one target database
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(prefix: &str, kind: DatabaseKind, database_name: &str, query: &str) -> Self {
        let scope = if kind.uses_database_name() {
            database_name.trim()
        } else {
            ""
        };
        let mut hasher = Sha256::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(scope.as_bytes());
        hasher.update([0u8]);
        hasher.update(normalize_query(query).as_bytes());
        CacheKey(format!("{prefix}:result:{kind}:{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Collapse runs of whitespace outside quotes into one space and trim.
///
/// Text inside `'...'` literals and `"..."` identifiers is kept byte for byte,
/// as is case everywhere. A doubled quote (`'it''s'`) closes and reopens the
/// literal, which leaves its content untouched too.
pub fn normalize_query(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for c in query.trim().chars() {
        match quote {
            Some(open) => {
                out.push(c);
                if c == open {
                    quote = None;
                }
            }
            None if c.is_whitespace() => pending_space = true,
            None => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

/// Stored payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub headers: Vec<String>,
    pub data: Vec<Row>,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub store_failures: u64,
    pub lookup_failures: u64,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    store_failures: AtomicU64,
    lookup_failures: AtomicU64,
}

/// Best-effort result cache over a [`CacheStore`].
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    prefix: String,
    counters: Counters,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, prefix: impl Into<String>) -> Self {
        ResultCache {
            store,
            prefix: prefix.into(),
            counters: Counters::default(),
        }
    }

    /// Build the configured store, or `None` when caching is disabled.
    /// Redis is connected lazily, so an unreachable server does not block startup.
    pub fn from_config(config: &CacheConfig) -> GatewayResult<Option<Self>> {
        let store: Arc<dyn CacheStore> = match config.backend {
            CacheBackend::Disabled => return Ok(None),
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
            CacheBackend::Redis => Arc::new(RedisStore::from_config(config)?),
        };
        Ok(Some(ResultCache::new(store, config.key_prefix.clone())))
    }

    pub fn key(&self, kind: DatabaseKind, database_name: &str, query: &str) -> CacheKey {
        CacheKey::new(&self.prefix, kind, database_name, query)
    }

    /// Fetch a cached result. Store errors and unreadable payloads count as misses.
    pub fn lookup(&self, key: &CacheKey) -> Option<CachedResult> {
        let raw = match self.store.get(key.as_str()) {
            Ok(raw) => raw,
            Err(e) => {
                self.counters.lookup_failures.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key.as_str(), error = %e, "cache_lookup_failed");
                return None;
            }
        };

        let Some(raw) = raw else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        match serde_json::from_str::<CachedResult>(&raw) {
            Ok(result) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(result)
            }
            Err(e) => {
                self.counters.lookup_failures.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key.as_str(), error = %e, "cache_payload_unreadable");
                None
            }
        }
    }

    /// Store a result with the given TTL. Failures are logged and swallowed.
    pub fn store(&self, key: &CacheKey, result: &CachedResult, ttl: Duration) {
        let outcome = serde_json::to_string(result)
            .map_err(Into::into)
            .and_then(|payload| self.store.set(key.as_str(), &payload, ttl));

        match outcome {
            Ok(()) => {
                self.counters.stores.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key.as_str(), ttl_secs = ttl.as_secs(), "cache_stored");
            }
            Err(e) => {
                self.counters.store_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key.as_str(), error = %e, "cache_store_failed");
            }
        }
    }

    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stores: self.counters.stores.load(Ordering::Relaxed),
            store_failures: self.counters.store_failures.load(Ordering::Relaxed),
            lookup_failures: self.counters.lookup_failures.load(Ordering::Relaxed),
        }
    }
}
