//! HTTP API Module
//!
//! Axum router for the query endpoints, health/metrics, and the `OpenAPI`
//! document, plus server startup with graceful shutdown.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod openapi;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;

use crate::config::HttpConfig;
use crate::protocol::{Gateway, API_PREFIX};

use self::handlers::{admin, query};

/// Interval between expired cache entry sweeps
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Serve the generated `OpenAPI` document
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}

fn cors_layer(config: &HttpConfig) -> Option<CorsLayer> {
    if !config.cors_origins.is_empty() {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|s| {
                let parsed = s.parse();
                if parsed.is_err() {
                    tracing::warn!(origin = %s, "cors_origin_invalid");
                }
                parsed.ok()
            })
            .collect();
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else if config.cors_allow_all {
        Some(CorsLayer::permissive())
    } else {
        // Same-origin only
        None
    }
}

/// Creates the Axum router
pub fn create_router(gateway: Arc<Gateway>, config: &HttpConfig) -> Router {
    let api = Router::new()
        .route("/run_query", post(query::run_query))
        .route("/run_query_async", post(query::run_query_async));

    let mut app = Router::new()
        .route("/health", get(admin::health))
        .route("/metrics", get(admin::stats))
        .route("/api/openapi.json", get(openapi_json))
        .nest(API_PREFIX, api)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(Extension(gateway));

    if let Some(cors) = cors_layer(config) {
        app = app.layer(cors);
    }

    app
}

/// Starts the HTTP server with graceful shutdown support.
///
/// Listens for SIGINT (ctrl-c) and SIGTERM. On shutdown the listener stops
/// accepting connections, in-flight requests finish, and the cache sweeper
/// is cancelled.
pub async fn start_http_server(
    gateway: Arc<Gateway>,
    config: &HttpConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(Arc::clone(&gateway), config);

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    // In-process cache entries expire lazily; sweep them so memory stays bounded
    let sweeper = Arc::clone(&gateway);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let purged = sweeper.purge_expired_cache();
                    if purged > 0 {
                        tracing::debug!(entries = purged, "cache_purged");
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let socket = if addr.is_ipv6() {
        tokio::net::TcpSocket::new_v6()?
    } else {
        tokio::net::TcpSocket::new_v4()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(1024)?;

    tracing::info!(%addr, docs = %format!("http://{addr}/api/openapi.json"), "server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    tracing::info!("server_stopped");

    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(signal = "SIGINT", error = %e, "signal_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::error!(signal = "SIGTERM", error = %e, "signal_handler_failed");
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::select! {
            () = ctrl_c => tracing::info!(signal = "SIGINT", "shutdown_requested"),
            () = terminate => tracing::info!(signal = "SIGTERM", "shutdown_requested"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        tracing::info!(signal = "SIGINT", "shutdown_requested");
    }
}
