//! # Querygate
//!
//! HTTP gateway that runs ad-hoc SQL against Oracle or PostgreSQL and returns
//! the rows as JSON, with an optional TTL result cache in front.
//!
//! ## Request Pipeline
//! ```text
//! POST /api/v1/run_query[_async]
//!     ↓
//! [Validation]        → empty query / size / cache TTL range
//!     ↓
//! [Engine Pool]       → one engine per (backend, database name)
//!     ↓
//! [Result Cache]      → only when cache_duration_seconds is set
//!     ↓
//! [Execution]         → connect, run, shape rows, release
//!     ↓
//! {cached, time_taken, headers, data}
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use querygate::{Config, Gateway, QueryRequest};
//!
//! let config = Config::load()?;
//! let gateway = Gateway::from_config(&config)?;
//!
//! let request = QueryRequest::new("SELECT 1 AS x FROM dual", "oracle")
//!     .with_cache_duration(60);
//! let response = gateway.run_query(&request)?;
//! assert_eq!(response.headers, vec!["x"]);
//! ```

// Configuration
pub mod config;

// Errors
pub mod error;

// Database engines and the keyed engine pool
pub mod backend;

// Statement execution and input limits
pub mod execution;

// Result cache (redis or in-process)
pub mod cache;

// HTTP surface and request handler
pub mod protocol;

pub use backend::{DatabaseKind, Environment, Row};
pub use config::Config;
pub use error::{GatewayError, GatewayResult};
pub use protocol::{Gateway, GatewayStats, QueryRequest, QueryResponse};
