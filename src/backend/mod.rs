//! Database Backends
//!
//! Resolves a `(database, database_name)` pair from a request to an
//! [`Engine`] that can open connections to that database.
//!
//! ## Design
//!
//! ```text
//! request.database ──parse──> DatabaseKind ──┐
//! request.database_name ─────────────────────┴─> EnginePool ──> Arc<dyn Engine>
//!                                                    │ miss
//!                                                    └─> EngineFactory::build
//! ```
//!
//! Engines are cheap descriptors (credentials + address). They are built
//! lazily and shared between requests once they have connected successfully. A
//! [`Connection`] is opened per request and closed when dropped.

pub mod oracle;
pub mod pool;
pub mod postgres;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{GatewayError, GatewayResult};

pub use pool::{EngineKey, EnginePool, ResolvedEngine};

/// One result row: column name to value, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Oracle,
    Postgres,
}

impl DatabaseKind {
    pub const ALL: [DatabaseKind; 2] = [DatabaseKind::Oracle, DatabaseKind::Postgres];

    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseKind::Oracle => "oracle",
            DatabaseKind::Postgres => "postgres",
        }
    }

    /// Whether the per-request database name selects anything for this backend.
    /// Oracle uses a single fixed DSN per environment.
    pub fn uses_database_name(self) -> bool {
        matches!(self, DatabaseKind::Postgres)
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseKind {
    type Err = GatewayError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oracle" => Ok(DatabaseKind::Oracle),
            "postgres" => Ok(DatabaseKind::Postgres),
            _ => Err(GatewayError::unsupported_backend(s)),
        }
    }
}

/// Deployment environment. Selects the Oracle parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Prod,
    Test,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Prod => f.write_str("prod"),
            Environment::Test => f.write_str("test"),
        }
    }
}

/// A handle capable of opening connections to one database instance.
pub trait Engine: Send + Sync {
    fn kind(&self) -> DatabaseKind;

    /// Human-readable target for logs. Must not contain credentials.
    fn describe(&self) -> String;

    /// Open a new connection. Failures are `ConnectionAcquisition` errors.
    fn connect(&self) -> GatewayResult<Box<dyn Connection>>;
}

/// An open connection. Closed on drop.
pub trait Connection: Send {
    /// Run the literal statement text and materialize every returned row.
    fn query(&mut self, sql: &str) -> GatewayResult<Vec<Row>>;
}

/// Builds engines on a pool miss.
pub trait EngineFactory: Send + Sync {
    fn build(&self, kind: DatabaseKind, database_name: &str) -> GatewayResult<Arc<dyn Engine>>;
}

/// Factory for the real Oracle and Postgres drivers, built from [`Config`].
pub struct DriverFactory {
    environment: Environment,
    oracle: crate::config::OracleConfig,
    postgres: crate::config::PostgresConfig,
}

impl DriverFactory {
    pub fn from_config(config: &Config) -> Self {
        DriverFactory {
            environment: config.environment,
            oracle: config.oracle.clone(),
            postgres: config.postgres.clone(),
        }
    }
}

impl EngineFactory for DriverFactory {
    fn build(&self, kind: DatabaseKind, database_name: &str) -> GatewayResult<Arc<dyn Engine>> {
        match kind {
            DatabaseKind::Oracle => {
                let params = self.oracle.params(self.environment);
                let engine = self::oracle::OracleEngine::new(params, self.environment)?;
                Ok(Arc::new(engine))
            }
            DatabaseKind::Postgres => {
                let database = if database_name.is_empty() {
                    self.postgres.default_database.as_str()
                } else {
                    database_name
                };
                let engine = self::postgres::PostgresEngine::new(&self.postgres, database);
                Ok(Arc::new(engine))
            }
        }
    }
}
