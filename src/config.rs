//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - querygate.toml (default configuration)
//! - querygate.local.toml (git-ignored local overrides)
//! - Environment variables (QUERYGATE_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # querygate.toml
//! environment = "test"
//!
//! [postgres]
//! host = "db.internal"
//! user = "reporting"
//! password = "secret"
//!
//! [oracle.test]
//! user = "scott"
//! password = "tiger"
//! dsn = "oracle-test:1521/ORCLPDB1"
//!
//! [cache]
//! backend = "redis"
//! host = "cache.internal"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! QUERYGATE_POSTGRES__PASSWORD=hunter2
//! QUERYGATE_CACHE__BACKEND=memory
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::backend::Environment;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which Oracle parameter set to use
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// HTTP server bind address
    #[serde(default = "default_http_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Allowed CORS origins. Takes precedence over `cors_allow_all` when non-empty.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Allow any origin
    #[serde(default = "default_true")]
    pub cors_allow_all: bool,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Oracle connection parameters, one set per environment.
/// The requested database name is ignored for Oracle; the DSN is fixed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub prod: OracleParams,
    #[serde(default)]
    pub test: OracleParams,
}

impl OracleConfig {
    pub fn params(&self, environment: Environment) -> &OracleParams {
        match environment {
            Environment::Prod => &self.prod,
            Environment::Test => &self.test,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Easy Connect string, e.g. `host:1521/service`
    #[serde(default)]
    pub dsn: String,
}

/// Postgres server parameters. The database itself is chosen per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    #[serde(default = "default_localhost")]
    pub host: String,
    #[serde(default = "default_postgres_port")]
    pub port: u16,
    #[serde(default = "default_postgres_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Used when a request leaves `database_name` empty
    #[serde(default = "default_postgres_user")]
    pub default_database: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Result cache store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// External Redis server
    #[default]
    Redis,
    /// In-process map with TTL expiry (single instance only)
    Memory,
    /// Requests carrying a cache duration are executed without caching
    Disabled,
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default = "default_localhost")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    /// Redis logical database index
    #[serde(default)]
    pub db: i64,
    #[serde(default)]
    pub password: Option<String>,
    /// Prefix for every key written to the store
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Connect/read timeout for the cache store in milliseconds
    #[serde(default = "default_cache_timeout_ms")]
    pub timeout_ms: u64,
}

impl CacheConfig {
    /// `redis://` URL for the configured server
    pub fn redis_url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{password}@{}:{}/{}",
                self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// Request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum query text size in bytes. 0 = no limit.
    #[serde(default = "default_max_query_bytes")]
    pub max_query_bytes: usize,

    /// Smallest accepted `cache_duration_seconds`
    #[serde(default = "default_min_cache_ttl_secs")]
    pub min_cache_ttl_secs: u64,

    /// Largest accepted `cache_duration_seconds`
    #[serde(default = "default_max_cache_ttl_secs")]
    pub max_cache_ttl_secs: u64,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_http_host() -> String {
    "127.0.0.1".to_string()
}
fn default_http_port() -> u16 {
    8000
}
fn default_max_body_bytes() -> usize {
    1_048_576 // 1 MB
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_localhost() -> String {
    "127.0.0.1".to_string()
}
fn default_postgres_port() -> u16 {
    5432
}
fn default_postgres_user() -> String {
    "postgres".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_redis_port() -> u16 {
    6379
}
fn default_key_prefix() -> String {
    "querygate".to_string()
}
fn default_cache_timeout_ms() -> u64 {
    500
}
fn default_max_query_bytes() -> usize {
    1_048_576 // 1 MB
}
fn default_min_cache_ttl_secs() -> u64 {
    10
}
fn default_max_cache_ttl_secs() -> u64 {
    3600
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. querygate.toml (base configuration)
    /// 2. querygate.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (QUERYGATE_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("querygate.toml"))
            .merge(Toml::file("querygate.local.toml"))
            .merge(Env::prefixed("QUERYGATE_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    ///
    /// Unlike the default locations, the named file must exist.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        if !std::path::Path::new(path).is_file() {
            return Err(figment::Error::from(format!(
                "config file '{path}' not found"
            )));
        }
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("QUERYGATE_").split("__"))
            .extract()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            host: default_http_host(),
            port: default_http_port(),
            cors_origins: Vec::new(),
            cors_allow_all: true,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        PostgresConfig {
            host: default_localhost(),
            port: default_postgres_port(),
            user: default_postgres_user(),
            password: String::new(),
            default_database: default_postgres_user(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            backend: CacheBackend::Redis,
            host: default_localhost(),
            port: default_redis_port(),
            db: 0,
            password: None,
            key_prefix: default_key_prefix(),
            timeout_ms: default_cache_timeout_ms(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_query_bytes: default_max_query_bytes(),
            min_cache_ttl_secs: default_min_cache_ttl_secs(),
            max_cache_ttl_secs: default_max_cache_ttl_secs(),
        }
    }
}
