//! Wire Format Types
//!
//! JSON request and response bodies of the query endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::backend::Row;

/// Query execution request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueryRequest {
    /// SQL text, executed verbatim
    pub query: String,
    /// Backend name, case-insensitive: `oracle` or `postgres`
    pub database: String,
    /// Target database; ignored for Oracle
    #[serde(default)]
    pub database_name: String,
    /// Cache the result for this many seconds. Absent = no cache read or write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_duration_seconds: Option<u64>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, database: impl Into<String>) -> Self {
        QueryRequest {
            query: query.into(),
            database: database.into(),
            database_name: String::new(),
            cache_duration_seconds: None,
        }
    }

    #[must_use]
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = name.into();
        self
    }

    #[must_use]
    pub fn with_cache_duration(mut self, seconds: u64) -> Self {
        self.cache_duration_seconds = Some(seconds);
        self
    }
}

/// Query execution response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    /// True when served from the result cache
    pub cached: bool,
    /// Seconds spent executing; 0.0 for cache hits
    pub time_taken: f64,
    /// Column names in result order
    pub headers: Vec<String>,
    /// One object per row, keyed by column name
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Row>,
}
