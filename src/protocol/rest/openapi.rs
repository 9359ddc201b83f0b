//! `OpenAPI` Specification
//!
//! Defines the `OpenAPI` documentation for the REST API using utoipa.

use utoipa::OpenApi;

use super::dto::{CacheStatsDto, HealthDto, StatsDto};
use super::error::ApiError;
use super::handlers::{admin, query};
use crate::protocol::wire::{QueryRequest, QueryResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Querygate API",
        version = "1.0.0",
        description = "HTTP gateway for ad-hoc SQL against Oracle and PostgreSQL"
    ),
    paths(
        // Query endpoints
        query::run_query,
        query::run_query_async,
        // Admin endpoints
        admin::health,
        admin::stats,
    ),
    components(schemas(
        QueryRequest,
        QueryResponse,
        ApiError,
        HealthDto,
        StatsDto,
        CacheStatsDto,
    )),
    tags(
        (name = "queries", description = "SQL execution with optional result caching"),
        (name = "admin", description = "Server administration and health")
    )
)]
pub struct ApiDoc;
