//! Query Execution Module
//!
//! Runs one statement on a freshly opened connection and shapes the rows:
//! - Headers come from the first row's column order
//! - Elapsed time covers execute + materialize only, not connection setup
//! - The connection is dropped (closed) on every exit path
//!
//! There is no timeout: a slow statement holds its worker until the driver returns.

mod limits;

pub use limits::QueryLimits;

use std::time::{Duration, Instant};

use crate::backend::{Engine, Row};
use crate::error::GatewayResult;

/// Shaped result of one statement
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedResult {
    pub headers: Vec<String>,
    pub data: Vec<Row>,
    pub elapsed: Duration,
}

/// Execute `query` verbatim against `engine`.
///
/// The text is neither parameterized nor sanitized.
pub fn execute(engine: &dyn Engine, query: &str) -> GatewayResult<ShapedResult> {
    let mut connection = engine.connect()?;

    let start = Instant::now();
    let data = connection.query(query)?;
    let elapsed = start.elapsed();
    drop(connection);

    let headers = headers_of(&data);
    Ok(ShapedResult {
        headers,
        data,
        elapsed,
    })
}

/// Column names in the first row's key order. Empty for an empty result,
/// even when the statement defines columns.
pub fn headers_of(rows: &[Row]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}
