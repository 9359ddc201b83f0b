//! Postgres engine over the synchronous `postgres` client.

use std::fmt::Write as _;
use std::time::Duration;

use ::postgres::types::{FromSql, Type};
use ::postgres::{Client, NoTls};
use serde_json::Value as JsonValue;

use super::{Connection, DatabaseKind, Engine, Row};
use crate::config::PostgresConfig;
use crate::error::{GatewayError, GatewayResult};

pub struct PostgresEngine {
    config: ::postgres::Config,
    target: String,
}

impl PostgresEngine {
    pub fn new(params: &PostgresConfig, database: &str) -> Self {
        let mut config = ::postgres::Config::new();
        config
            .host(&params.host)
            .port(params.port)
            .user(&params.user)
            .password(&params.password)
            .dbname(database)
            .application_name("querygate")
            .connect_timeout(Duration::from_secs(params.connect_timeout_secs));

        PostgresEngine {
            config,
            target: format!("{}:{}/{}", params.host, params.port, database),
        }
    }
}

impl Engine for PostgresEngine {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    fn describe(&self) -> String {
        self.target.clone()
    }

    fn connect(&self) -> GatewayResult<Box<dyn Connection>> {
        let client =
            self.config
                .connect(NoTls)
                .map_err(|e| GatewayError::ConnectionAcquisition {
                    backend: DatabaseKind::Postgres,
                    reason: e.to_string(),
                })?;
        Ok(Box::new(PostgresConnection { client }))
    }
}

struct PostgresConnection {
    client: Client,
}

impl Connection for PostgresConnection {
    fn query(&mut self, sql: &str) -> GatewayResult<Vec<Row>> {
        let rows = self.client.query(sql, &[])?;
        rows.iter().map(row_to_map).collect()
    }
}

fn row_to_map(row: &::postgres::Row) -> GatewayResult<Row> {
    let mut map = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = cell_to_json(row, idx, column.type_())?;
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

/// Decode one cell by its Postgres type. Dates, decimals and UUIDs become
/// strings; unknown types fall back to their text form or null.
fn cell_to_json(row: &::postgres::Row, idx: usize, ty: &Type) -> GatewayResult<JsonValue> {
    let value = match ty.name() {
        "bool" => row.try_get::<_, Option<bool>>(idx)?.map(JsonValue::Bool),
        "int2" => row.try_get::<_, Option<i16>>(idx)?.map(JsonValue::from),
        "int4" => row.try_get::<_, Option<i32>>(idx)?.map(JsonValue::from),
        "int8" => row.try_get::<_, Option<i64>>(idx)?.map(JsonValue::from),
        "oid" => row.try_get::<_, Option<u32>>(idx)?.map(JsonValue::from),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| float_to_json(f64::from(v))),
        "float8" => row.try_get::<_, Option<f64>>(idx)?.map(float_to_json),
        "numeric" => row
            .try_get::<_, Option<NumericText>>(idx)?
            .map(|n| JsonValue::String(n.0)),
        "date" => row
            .try_get::<_, Option<chrono::NaiveDate>>(idx)?
            .map(|d| JsonValue::String(d.format("%Y-%m-%d").to_string())),
        "time" => row
            .try_get::<_, Option<chrono::NaiveTime>>(idx)?
            .map(|t| JsonValue::String(t.to_string())),
        "timestamp" => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)?
            .map(|dt| JsonValue::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "timestamptz" => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)?
            .map(|dt| JsonValue::String(dt.to_rfc3339())),
        "uuid" => row
            .try_get::<_, Option<uuid::Uuid>>(idx)?
            .map(|u| JsonValue::String(u.to_string())),
        "json" | "jsonb" => row.try_get::<_, Option<JsonValue>>(idx)?,
        _ => row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(JsonValue::String),
    };
    Ok(value.unwrap_or(JsonValue::Null))
}

type DecodeError = Box<dyn std::error::Error + Sync + Send>;

/// Exact text of a `numeric` cell, including `NaN` and values wider than any
/// fixed-size decimal type.
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        decode_numeric(raw).map(NumericText)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Binary `numeric`: ndigits, weight, sign, dscale, then ndigits base-10000
/// digits, all big-endian 16-bit. `weight` is the power of 10000 of the first
/// digit; `dscale` is the number of decimal places to print.
fn decode_numeric(raw: &[u8]) -> Result<String, DecodeError> {
    let word = |i: usize| {
        raw.get(2 * i..2 * i + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
    };
    let (Some(ndigits), Some(weight), Some(sign), Some(dscale)) =
        (word(0), word(1), word(2), word(3))
    else {
        return Err("numeric header truncated".into());
    };

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }

    let digits = (0..usize::from(ndigits))
        .map(|i| word(4 + i).ok_or("numeric digits truncated"))
        .collect::<Result<Vec<u16>, _>>()?;
    let weight = i32::from(weight as i16);
    let digit = |i: i32| {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.get(i))
            .copied()
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        let _ = write!(out, "{}", digit(0));
        for i in 1..=weight {
            let _ = write!(out, "{:04}", digit(i));
        }
    }

    let dscale = usize::from(dscale);
    if dscale > 0 {
        let mut frac = String::new();
        for j in 1..=dscale.div_ceil(4) as i32 {
            let _ = write!(frac, "{:04}", digit(weight + j));
        }
        frac.truncate(dscale);
        out.push('.');
        out.push_str(&frac);
    }
    Ok(out)
}

/// NaN and infinities have no JSON number form
fn float_to_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v).map_or_else(|| JsonValue::String(v.to_string()), JsonValue::Number)
}
