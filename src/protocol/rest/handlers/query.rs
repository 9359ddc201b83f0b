//! Query Handlers
//!
//! Endpoints for SQL execution. Both share one contract; they differ only in
//! where the blocking work runs.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use tracing::Instrument;

use crate::protocol::rest::error::{ApiError, RestError};
use crate::protocol::wire::{QueryRequest, QueryResponse};
use crate::protocol::Gateway;

/// Execute a query on the serving thread
///
/// The connection, statement and cache I/O block the runtime worker that
/// accepted the request until they finish. The worker is marked as blocking
/// first, since the sync drivers drive their own runtime internally.
#[utoipa::path(
    post,
    path = "/api/v1/run_query",
    tag = "queries",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Query executed or served from cache", body = QueryResponse),
        (status = 400, description = "Empty query, bad input, or unresolvable database", body = ApiError),
        (status = 500, description = "Query execution failed", body = ApiError),
    )
)]
pub async fn run_query(
    Extension(gateway): Extension<Arc<Gateway>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, RestError> {
    let Json(request) = payload?;
    let span = tracing::info_span!(
        "run_query",
        request_id = %uuid::Uuid::new_v4(),
        database = %request.database
    );

    let response = block_on_serving_thread(|| span.in_scope(|| gateway.run_query(&request)))?;
    Ok(Json(response))
}

/// Run blocking work without leaving the caller's thread of control.
///
/// On a multi-threaded runtime the current worker hands its other tasks off
/// and blocks in place. A current-thread runtime cannot do that, so the work
/// runs on a scoped thread outside the runtime context while the caller waits.
fn block_on_serving_thread<R: Send>(work: impl FnOnce() -> R + Send) -> R {
    use tokio::runtime::{Handle, RuntimeFlavor};

    match Handle::try_current().map(|h| h.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(work),
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(work)
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        }),
        Err(_) => work(),
    }
}

/// Execute a query on the blocking worker pool
#[utoipa::path(
    post,
    path = "/api/v1/run_query_async",
    tag = "queries",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Query executed or served from cache", body = QueryResponse),
        (status = 400, description = "Empty query, bad input, or unresolvable database", body = ApiError),
        (status = 500, description = "Query execution failed", body = ApiError),
    )
)]
pub async fn run_query_async(
    Extension(gateway): Extension<Arc<Gateway>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, RestError> {
    let Json(request) = payload?;
    let span = tracing::info_span!(
        "run_query_async",
        request_id = %uuid::Uuid::new_v4(),
        database = %request.database
    );

    let response = gateway.run_query_async(request).instrument(span).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Connection, DatabaseKind, Engine, EngineFactory, EnginePool, Row};
    use crate::error::{GatewayError, GatewayResult};
    use crate::execution::QueryLimits;
    use serde_json::json;

    struct OneRowFactory;
    struct OneRowEngine(DatabaseKind);
    struct OneRowConnection;

    impl EngineFactory for OneRowFactory {
        fn build(&self, kind: DatabaseKind, _: &str) -> GatewayResult<Arc<dyn Engine>> {
            Ok(Arc::new(OneRowEngine(kind)))
        }
    }

    impl Engine for OneRowEngine {
        fn kind(&self) -> DatabaseKind {
            self.0
        }
        fn describe(&self) -> String {
            "one-row".to_string()
        }
        fn connect(&self) -> GatewayResult<Box<dyn Connection>> {
            Ok(Box::new(OneRowConnection))
        }
    }

    impl Connection for OneRowConnection {
        fn query(&mut self, sql: &str) -> GatewayResult<Vec<Row>> {
            if sql.starts_with("BROKEN") {
                return Err(GatewayError::execution("ORA-00900: invalid SQL statement"));
            }
            let mut row = Row::new();
            row.insert("x".to_string(), json!(1));
            Ok(vec![row])
        }
    }

    fn make_gateway() -> Arc<Gateway> {
        Arc::new(Gateway::new(
            EnginePool::new(Arc::new(OneRowFactory)),
            None,
            QueryLimits::default(),
        ))
    }

    #[tokio::test]
    async fn test_run_query_ok() {
        let request = QueryRequest::new("SELECT 1 AS x", "postgres").with_database_name("testdb");
        let resp = run_query(Extension(make_gateway()), Ok(Json(request)))
            .await
            .unwrap();
        assert!(!resp.0.cached);
        assert_eq!(resp.0.headers, vec!["x"]);
    }

    #[tokio::test]
    async fn test_run_query_async_execution_error() {
        let request = QueryRequest::new("BROKEN", "oracle");
        let err = run_query_async(Extension(make_gateway()), Ok(Json(request)))
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.error.detail.contains("ORA-00900"));
    }

    #[test]
    fn test_block_on_serving_thread_outside_runtime() {
        assert_eq!(block_on_serving_thread(|| 7), 7);
    }

    #[tokio::test]
    async fn test_block_on_serving_thread_leaves_runtime_context() {
        let inside = block_on_serving_thread(|| tokio::runtime::Handle::try_current().is_ok());
        assert!(!inside);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_block_on_serving_thread_multi_thread() {
        let thread = std::thread::current().id();
        let same = block_on_serving_thread(move || std::thread::current().id() == thread);
        assert!(same);
    }

    #[tokio::test]
    async fn test_run_query_unsupported_backend_is_400() {
        let request = QueryRequest::new("SELECT 1", "db2");
        let err = run_query(Extension(make_gateway()), Ok(Json(request)))
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.error.code, "UNSUPPORTED_BACKEND");
    }
}
