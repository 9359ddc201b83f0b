//! Shared fixtures: an in-memory engine stack standing in for real databases.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use querygate::backend::{Connection, DatabaseKind, Engine, EngineFactory, EnginePool, Row};
use querygate::cache::{MemoryStore, ResultCache};
use querygate::config::{CacheBackend, Config, HttpConfig};
use querygate::execution::QueryLimits;
use querygate::protocol::rest::create_router;
use querygate::{Gateway, GatewayError, GatewayResult};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Canned answers by query text:
/// - `SELECT 1 AS x` -> `[{"x": 1}]`
/// - queries containing `WHERE 1 = 0` -> no rows
/// - queries containing `missing_table` -> execution error
/// - anything else -> one row echoing the backend and database name
pub struct ScriptedFactory {
    pub executions: Arc<AtomicUsize>,
}

struct ScriptedEngine {
    kind: DatabaseKind,
    database_name: String,
    executions: Arc<AtomicUsize>,
}

struct ScriptedConnection {
    kind: DatabaseKind,
    database_name: String,
    executions: Arc<AtomicUsize>,
}

impl EngineFactory for ScriptedFactory {
    fn build(&self, kind: DatabaseKind, database_name: &str) -> GatewayResult<Arc<dyn Engine>> {
        Ok(Arc::new(ScriptedEngine {
            kind,
            database_name: database_name.to_string(),
            executions: Arc::clone(&self.executions),
        }))
    }
}

impl Engine for ScriptedEngine {
    fn kind(&self) -> DatabaseKind {
        self.kind
    }

    fn describe(&self) -> String {
        format!("scripted {}/{}", self.kind, self.database_name)
    }

    fn connect(&self) -> GatewayResult<Box<dyn Connection>> {
        Ok(Box::new(ScriptedConnection {
            kind: self.kind,
            database_name: self.database_name.clone(),
            executions: Arc::clone(&self.executions),
        }))
    }
}

impl Connection for ScriptedConnection {
    fn query(&mut self, sql: &str) -> GatewayResult<Vec<Row>> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if sql.contains("missing_table") {
            return Err(GatewayError::execution(
                "relation \"missing_table\" does not exist",
            ));
        }
        if sql.contains("WHERE 1 = 0") {
            return Ok(Vec::new());
        }
        if sql.trim() == "SELECT 1 AS x" {
            let mut row = Row::new();
            row.insert("x".to_string(), json!(1));
            return Ok(vec![row]);
        }
        let mut row = Row::new();
        row.insert("backend".to_string(), json!(self.kind.as_str()));
        row.insert("database_name".to_string(), json!(self.database_name));
        row.insert("n".to_string(), json!(42));
        Ok(vec![row])
    }
}

pub struct TestApp {
    pub router: axum::Router,
    pub gateway: Arc<Gateway>,
    pub executions: Arc<AtomicUsize>,
}

impl TestApp {
    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

fn build_app(cache: Option<ResultCache>) -> TestApp {
    let executions = Arc::new(AtomicUsize::new(0));
    let factory = ScriptedFactory {
        executions: Arc::clone(&executions),
    };
    let gateway = Arc::new(Gateway::new(
        EnginePool::new(Arc::new(factory)),
        cache,
        QueryLimits::default(),
    ));
    let router = create_router(Arc::clone(&gateway), &HttpConfig::default());
    TestApp {
        router,
        gateway,
        executions,
    }
}

/// App with an in-process cache store.
pub fn create_test_app() -> TestApp {
    build_app(Some(ResultCache::new(
        Arc::new(MemoryStore::new()),
        "querygate-test",
    )))
}

/// App with caching disabled.
pub fn create_uncached_app() -> TestApp {
    build_app(None)
}

/// App wired to the real drivers, with Postgres pointed at a closed local port.
pub fn create_unreachable_postgres_app() -> TestApp {
    let mut config = Config::default();
    config.postgres.host = "127.0.0.1".to_string();
    config.postgres.port = 1;
    config.postgres.connect_timeout_secs = 1;
    config.cache.backend = CacheBackend::Disabled;

    let gateway = Arc::new(Gateway::from_config(&config).unwrap());
    let router = create_router(Arc::clone(&gateway), &HttpConfig::default());
    TestApp {
        router,
        gateway,
        executions: Arc::new(AtomicUsize::new(0)),
    }
}

pub async fn send_json_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let req = match method {
        "GET" => Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
        "POST" => Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_string(&body.unwrap_or(json!({}))).unwrap(),
            ))
            .unwrap(),
        _ => panic!("Unsupported method"),
    };

    send_request(app, req).await
}

pub async fn send_raw_post(app: &axum::Router, uri: &str, raw: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(raw.to_string()))
        .unwrap();
    send_request(app, req).await
}

async fn send_request(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(json!({}));
    (status, json)
}
