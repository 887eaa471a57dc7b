//! Value coercion for `cast(x as T)` and date parsing.

use crate::error::{Error, Result};
use crate::numeric::Number;
use crate::types::DataType;
use crate::value::Value;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::str::FromStr;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parses a date or timestamp string into UTC epoch millis.
///
/// Accepts RFC 3339, `yyyy-MM-dd[ HH:mm:ss[.SSS]]`, `yyyy/MM/dd HH:mm:ss` and a
/// bare integer taken as epoch millis. Zone-less inputs are read as UTC.
pub fn parse_datetime(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(ms) = text.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Renders epoch millis as an RFC 3339 UTC string.
pub fn format_datetime(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => millis.to_string(),
    }
}

/// Parses the textual boolean spellings accepted by `cast(x as boolean)`.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "y" | "yes" | "1" => Some(true),
        "false" | "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

impl Value {
    /// Coerces this value to `target`.
    ///
    /// Null casts to null for every target. Fails with `Error::Cast` when the value
    /// cannot be represented.
    pub fn cast_to(&self, target: DataType) -> Result<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        let fail = || Error::cast(self, target.name());
        let cast = match target {
            DataType::String => Value::String(self.to_string()),
            DataType::Boolean => match self {
                Value::Boolean(b) => Value::Boolean(*b),
                Value::String(s) => Value::Boolean(parse_bool(s).ok_or_else(fail)?),
                other => Value::Boolean(!Number::from_value(other).ok_or_else(fail)?.is_zero()),
            },
            DataType::Int32 => {
                let v = self.to_number(target)?.to_i64().ok_or_else(fail)?;
                Value::Int32(i32::try_from(v).map_err(|_| fail())?)
            }
            DataType::Int64 => Value::Int64(self.to_number(target)?.to_i64().ok_or_else(fail)?),
            DataType::Float32 => Value::Float32(self.to_number(target)?.to_f64() as f32),
            DataType::Float64 => Value::Float64(self.to_number(target)?.to_f64()),
            DataType::Decimal => match self {
                Value::String(s) => {
                    Value::Decimal(BigDecimal::from_str(s.trim()).map_err(|_| fail())?)
                }
                other => Value::Decimal(other.to_number(target)?.to_decimal().ok_or_else(fail)?),
            },
            DataType::DateTime => match self {
                Value::DateTime(ms) => Value::DateTime(*ms),
                Value::String(s) => Value::DateTime(parse_datetime(s).ok_or_else(fail)?),
                other => Value::DateTime(other.to_number(target)?.to_i64().ok_or_else(fail)?),
            },
            DataType::List => match self {
                Value::List(items) => Value::List(items.clone()),
                other => Value::List(vec![other.clone()]),
            },
            DataType::Record => match self {
                Value::Record(r) => Value::Record(r.clone()),
                _ => return Err(fail()),
            },
        };
        Ok(cast)
    }

    fn to_number(&self, target: DataType) -> Result<Number> {
        match self {
            Value::Boolean(b) => Ok(Number::Int(i64::from(*b))),
            other => Number::from_value(other).ok_or_else(|| Error::cast(self, target.name())),
        }
    }
}
