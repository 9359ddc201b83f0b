//! Query Gateway Protocol
//!
//! HTTP surface, wire format, and the request handler behind it.
//!
//! # Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                   Query Gateway Protocol                    |
//! +-------------------------------------------------------------+
//! |  HTTP Endpoints:                                            |
//! |    - /health: liveness                                      |
//! |    - /metrics: gateway and cache counters                   |
//! |    - /api/v1/run_query: execute on the serving thread       |
//! |    - /api/v1/run_query_async: execute on a blocking worker  |
//! |    - /api/openapi.json: OpenAPI document                    |
//! +-------------------------------------------------------------+
//! |  Wire Format: JSON                                          |
//! +-------------------------------------------------------------+
//! ```
//!
//! # Module Structure
//!
//! - `wire` - Request/response bodies (`QueryRequest`, `QueryResponse`)
//! - `handler` - `Gateway`: validation, engine resolution, caching, execution
//! - `rest` - axum routing, handlers, error mapping

pub mod handler;
pub mod rest;
pub mod wire;

// Re-export wire types
pub use wire::{QueryRequest, QueryResponse};

// Re-export handler
pub use handler::{Gateway, GatewayStats};

// Protocol Constants
/// Default HTTP server port
pub const DEFAULT_PORT: u16 = 8000;

/// API path prefix
pub const API_PREFIX: &str = "/api/v1";
