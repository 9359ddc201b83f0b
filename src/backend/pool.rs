//! Keyed Engine Pool
//!
//! Maps a backend identity to a lazily built, shared [`Engine`]. A freshly
//! built engine is only kept once it has opened a connection, so database
//! names that do not exist never take up a slot. Concurrent requests for the
//! same identity may race to build; the first admitted engine wins and later
//! builds are dropped.

use std::sync::Arc;

use dashmap::DashMap;

use super::{DatabaseKind, Engine, EngineFactory};
use crate::error::GatewayResult;

/// Identity of one engine in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EngineKey {
    pub kind: DatabaseKind,
    /// Empty for backends that ignore the database name
    pub database_name: String,
}

impl EngineKey {
    pub fn new(kind: DatabaseKind, database_name: &str) -> Self {
        let database_name = if kind.uses_database_name() {
            database_name.trim().to_string()
        } else {
            String::new()
        };
        EngineKey {
            kind,
            database_name,
        }
    }
}

/// An engine handed out by [`EnginePool::resolve`].
pub struct ResolvedEngine {
    key: EngineKey,
    engine: Arc<dyn Engine>,
    pooled: bool,
}

impl ResolvedEngine {
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// False for an engine built by this call and not yet admitted
    pub fn is_pooled(&self) -> bool {
        self.pooled
    }
}

/// Engine resolver with a per-identity cache of built engines.
pub struct EnginePool {
    factory: Arc<dyn EngineFactory>,
    engines: DashMap<EngineKey, Arc<dyn Engine>>,
}

impl EnginePool {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        EnginePool {
            factory,
            engines: DashMap::new(),
        }
    }

    /// Resolve `database` (case-insensitive backend name) and `database_name`
    /// to an engine. A pool miss builds a new engine that is not kept until
    /// [`EnginePool::admit`] is called for it.
    pub fn resolve(&self, database: &str, database_name: &str) -> GatewayResult<ResolvedEngine> {
        let kind: DatabaseKind = database.parse()?;
        let key = EngineKey::new(kind, database_name);

        if let Some(engine) = self.engines.get(&key) {
            let engine = Arc::clone(engine.value());
            return Ok(ResolvedEngine {
                key,
                engine,
                pooled: true,
            });
        }

        let engine = self.factory.build(kind, &key.database_name)?;
        tracing::debug!(database = %kind, target = %engine.describe(), "engine_built");
        Ok(ResolvedEngine {
            key,
            engine,
            pooled: false,
        })
    }

    /// Keep a resolved engine for later requests. Call once it has connected.
    pub fn admit(&self, resolved: &ResolvedEngine) {
        if resolved.pooled {
            return;
        }
        self.engines
            .entry(resolved.key.clone())
            .or_insert_with(|| Arc::clone(&resolved.engine));
    }

    /// Number of distinct engines built so far
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
