//! Cell coercion shared by the text-based sources.

use meter_client::timestamp::parse_utc;
use time::OffsetDateTime;

use crate::pipeline::LoadError;

fn invalid(row: u64, column: &'static str, value: &str, reason: impl ToString) -> LoadError {
    LoadError::InvalidValue {
        row,
        column,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn meter_id(row: u64, s: &str) -> Result<i64, LoadError> {
    s.trim().parse().map_err(|e| invalid(row, "id", s, e))
}

pub fn timestamp(row: u64, s: &str) -> Result<OffsetDateTime, LoadError> {
    parse_utc(s).map_err(|e| invalid(row, "timestamp", s, e))
}

/// Coerce a text cell to kWh. A blank cell is a missing value and becomes NaN.
pub fn kwh(row: u64, s: &str) -> Result<f64, LoadError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(f64::NAN);
    }
    trimmed.parse().map_err(|e| invalid(row, "value_kwh", s, e))
}

/// Coerce a JSON value to kWh: numbers as-is, numeric strings parsed, null as NaN.
pub fn kwh_json(row: u64, v: &serde_json::Value) -> Result<f64, LoadError> {
    match v {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(row, "value_kwh", &n.to_string(), "not representable as f64")),
        serde_json::Value::String(s) => kwh(row, s),
        serde_json::Value::Null => Ok(f64::NAN),
        other => Err(invalid(row, "value_kwh", &other.to_string(), "expected a number")),
    }
}
