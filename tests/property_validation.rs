//! Property tests for request validation through the HTTP surface.

mod common;

use axum::http::StatusCode;
use common::{create_test_app, send_json_request};
use proptest::prelude::*;
use serde_json::json;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whitespace-only text never reaches a database.
    #[test]
    fn prop_whitespace_query_is_400(query in "[ \t\r\n]{0,32}") {
        let app = create_test_app();
        let (status, json) = runtime().block_on(send_json_request(
            &app.router,
            "POST",
            "/api/v1/run_query",
            Some(json!({"query": query, "database": "postgres"})),
        ));
        prop_assert_eq!(status, StatusCode::BAD_REQUEST);
        prop_assert_eq!(json["detail"].as_str(), Some("Query cannot be empty"));
        prop_assert_eq!(app.execution_count(), 0);
    }

    /// Anything other than the two backend names is rejected with the valid set.
    #[test]
    fn prop_unknown_backend_is_400(database in "[a-z0-9_]{1,16}") {
        prop_assume!(database != "oracle" && database != "postgres");
        let app = create_test_app();
        let (status, json) = runtime().block_on(send_json_request(
            &app.router,
            "POST",
            "/api/v1/run_query_async",
            Some(json!({"query": "SELECT 1 AS x", "database": database})),
        ));
        prop_assert_eq!(status, StatusCode::BAD_REQUEST);
        prop_assert_eq!(json["code"].as_str(), Some("UNSUPPORTED_BACKEND"));
        let detail = json["detail"].as_str().unwrap_or_default();
        prop_assert!(detail.contains("oracle") && detail.contains("postgres"));
    }

    /// Queries differing only in whitespace share one cache entry.
    #[test]
    fn prop_cache_ignores_whitespace(pad in "[ \t\n]{1,8}") {
        let app = create_test_app();
        let rt = runtime();
        let first = json!({"query": "SELECT * FROM who", "database": "oracle", "cache_duration_seconds": 60});
        let second = json!({
            "query": format!("SELECT{pad}*{pad}FROM who{pad}"),
            "database": "oracle",
            "cache_duration_seconds": 60
        });
        rt.block_on(send_json_request(&app.router, "POST", "/api/v1/run_query", Some(first)));
        let (status, json) = rt.block_on(send_json_request(&app.router, "POST", "/api/v1/run_query", Some(second)));
        prop_assert_eq!(status, StatusCode::OK);
        prop_assert_eq!(json["cached"].as_bool(), Some(true));
        prop_assert_eq!(app.execution_count(), 1);
    }

    /// Whitespace inside a string literal is part of the query's meaning.
    #[test]
    fn prop_cache_respects_literal_whitespace(pad in "[ \t]{2,6}") {
        let app = create_test_app();
        let rt = runtime();
        let first = json!({"query": "SELECT * FROM who WHERE name = 'John Smith'", "database": "postgres", "cache_duration_seconds": 60});
        let second = json!({
            "query": format!("SELECT * FROM who WHERE name = 'John{pad}Smith'"),
            "database": "postgres",
            "cache_duration_seconds": 60
        });
        rt.block_on(send_json_request(&app.router, "POST", "/api/v1/run_query", Some(first)));
        let (status, json) = rt.block_on(send_json_request(&app.router, "POST", "/api/v1/run_query", Some(second)));
        prop_assert_eq!(status, StatusCode::OK);
        prop_assert_eq!(json["cached"].as_bool(), Some(false));
        prop_assert_eq!(app.execution_count(), 2);
    }
}
