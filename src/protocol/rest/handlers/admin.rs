//! Admin Handlers
//!
//! Health check and statistics endpoints.

use std::sync::Arc;

use axum::{Extension, Json};

use crate::protocol::rest::dto::{HealthDto, StatsDto};
use crate::protocol::Gateway;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "admin",
    responses(
        (status = 200, description = "Server is up", body = HealthDto),
    )
)]
pub async fn health() -> Json<HealthDto> {
    Json(HealthDto::ok())
}

/// Server statistics endpoint
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "admin",
    responses(
        (status = 200, description = "Gateway and cache counters", body = StatsDto),
    )
)]
pub async fn stats(Extension(gateway): Extension<Arc<Gateway>>) -> Json<StatsDto> {
    Json(StatsDto::from(gateway.stats()))
}
