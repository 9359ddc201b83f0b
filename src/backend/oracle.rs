//! Oracle engine over the `oracle` (ODPI-C) driver.
//!
//! One fixed DSN per environment; the per-request database name is ignored.

use ::oracle::sql_type::OracleType;
use serde_json::Value as JsonValue;

use super::{Connection, DatabaseKind, Engine, Environment, Row};
use crate::config::OracleParams;
use crate::error::{GatewayError, GatewayResult};

pub struct OracleEngine {
    user: String,
    password: String,
    dsn: String,
    environment: Environment,
}

impl OracleEngine {
    /// Fails when the environment's parameter set has no DSN or user.
    pub fn new(params: &OracleParams, environment: Environment) -> GatewayResult<Self> {
        if params.dsn.trim().is_empty() || params.user.trim().is_empty() {
            return Err(GatewayError::ConnectionAcquisition {
                backend: DatabaseKind::Oracle,
                reason: format!("no Oracle DSN/user configured for environment '{environment}'"),
            });
        }
        Ok(OracleEngine {
            user: params.user.clone(),
            password: params.password.clone(),
            dsn: normalize_dsn(&params.dsn),
            environment,
        })
    }
}

/// Easy Connect strings are accepted with or without the leading `//`.
fn normalize_dsn(dsn: &str) -> String {
    let dsn = dsn.trim();
    if dsn.starts_with("//") || dsn.starts_with('(') || !dsn.contains('/') {
        dsn.to_string()
    } else {
        format!("//{dsn}")
    }
}

impl Engine for OracleEngine {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Oracle
    }

    fn describe(&self) -> String {
        format!("{}@{} ({})", self.user, self.dsn, self.environment)
    }

    fn connect(&self) -> GatewayResult<Box<dyn Connection>> {
        let conn = ::oracle::Connection::connect(&self.user, &self.password, &self.dsn).map_err(
            |e| GatewayError::ConnectionAcquisition {
                backend: DatabaseKind::Oracle,
                reason: e.to_string(),
            },
        )?;
        Ok(Box::new(OracleConnection { conn }))
    }
}

struct OracleConnection {
    conn: ::oracle::Connection,
}

impl Connection for OracleConnection {
    fn query(&mut self, sql: &str) -> GatewayResult<Vec<Row>> {
        let result_set = self.conn.query(sql, &[])?;
        let columns: Vec<(String, OracleType)> = result_set
            .column_info()
            .iter()
            .map(|col| (col.name().to_string(), col.oracle_type().clone()))
            .collect();

        let mut rows = Vec::new();
        for row_result in result_set {
            let row = row_result?;
            let mut map = Row::new();
            for (idx, (name, ty)) in columns.iter().enumerate() {
                map.insert(name.clone(), cell_to_json(&row, idx, ty)?);
            }
            rows.push(map);
        }
        Ok(rows)
    }
}

/// NUMBERs are read as text so no digits are lost: integral values that fit
/// an `i64` become JSON integers, the rest stay strings. Binary floats become
/// JSON numbers; dates and timestamps become strings; anything else is
/// fetched as text.
fn cell_to_json(row: &::oracle::Row, idx: usize, ty: &OracleType) -> GatewayResult<JsonValue> {
    let value = match ty {
        OracleType::Number(_, _) | OracleType::Float(_) | OracleType::Int64 => row
            .get::<_, Option<String>>(idx)?
            .map(|text| number_text_to_json(&text)),
        OracleType::BinaryFloat | OracleType::BinaryDouble => row
            .get::<_, Option<f64>>(idx)?
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number),
        OracleType::Boolean => row.get::<_, Option<bool>>(idx)?.map(JsonValue::Bool),
        OracleType::Date | OracleType::Timestamp(_) => row
            .get::<_, Option<chrono::NaiveDateTime>>(idx)?
            .map(|dt| JsonValue::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        OracleType::TimestampTZ(_) | OracleType::TimestampLTZ(_) => row
            .get::<_, Option<chrono::DateTime<chrono::FixedOffset>>>(idx)?
            .map(|dt| JsonValue::String(dt.to_rfc3339())),
        _ => row.get::<_, Option<String>>(idx)?.map(JsonValue::String),
    };
    Ok(value.unwrap_or(JsonValue::Null))
}

/// Shape the text form of an Oracle NUMBER. Computed columns such as
/// `SELECT 1 AS x FROM dual` carry no declared scale, so the value decides.
fn number_text_to_json(text: &str) -> JsonValue {
    let text = text.trim();
    match text.parse::<i64>() {
        Ok(n) => JsonValue::from(n),
        Err(_) => JsonValue::String(text.to_string()),
    }
}
