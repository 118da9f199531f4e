//! Driver value decoding.
//!
//! This module turns driver rows into positional JSON values.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the column's declared type (domains resolved to
//!    their base type) into a logical category
//! 2. A decoder per category extracts the value with the exact Rust type
//!
//! Column names always come from the result metadata; values never decide them.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::types::{Oid, PgInterval, PgTimeTz};
use sqlx::postgres::{PgRow, PgTypeInfo, PgTypeKind};
use sqlx::{Column, Decode, Postgres, Row, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Temporal,
    Array,
    Unknown,
}

/// Classify a driver type name into a logical category.
///
/// Names are matched exactly; substring matching misfiles types such as
/// `INTERVAL` or `POINT` as integers.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_uppercase();

    if upper.ends_with("[]") {
        return TypeCategory::Array;
    }

    match upper.as_str() {
        "INT2" | "INT4" | "INT8" | "OID" | "SMALLINT" | "INTEGER" | "INT" | "BIGINT" => {
            TypeCategory::Integer
        }
        "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE PRECISION" | "FLOAT" => TypeCategory::Float,
        "NUMERIC" | "DECIMAL" => TypeCategory::Decimal,
        "BOOL" | "BOOLEAN" => TypeCategory::Boolean,
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" | "UNKNOWN" | "\"CHAR\"" | "CHAR" => {
            TypeCategory::Text
        }
        "BYTEA" => TypeCategory::Binary,
        "JSON" | "JSONB" => TypeCategory::Json,
        "UUID" => TypeCategory::Uuid,
        "DATE" | "TIME" | "TIMETZ" | "TIMESTAMP" | "TIMESTAMPTZ" | "INTERVAL" => {
            TypeCategory::Temporal
        }
        _ => TypeCategory::Unknown,
    }
}

/// Follow domain types down to the type that actually carries the bytes.
fn resolve_domain(ty: &PgTypeInfo) -> &PgTypeInfo {
    match ty.kind() {
        PgTypeKind::Domain(base) => resolve_domain(base),
        _ => ty,
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Encode binary column data as a base64 JSON string.
pub fn encode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    JsonValue::String(STANDARD.encode(bytes))
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting driver rows to positional JSON values.
pub trait RowToJson {
    /// One JSON value per column, in result order.
    fn to_json_values(&self) -> Vec<JsonValue>;
}

impl RowToJson for PgRow {
    fn to_json_values(&self) -> Vec<JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| postgres::decode_column(self, idx, col.type_info()))
            .collect()
    }
}

mod postgres {
    use super::*;

    /// Decode with the Rust type picked from the resolved type name.
    ///
    /// The unchecked getter is used because the declared type may be a domain,
    /// which the checked getter refuses even when the base type matches.
    fn get<'r, T>(row: &'r PgRow, idx: usize) -> Option<T>
    where
        T: Decode<'r, Postgres>,
    {
        match row.try_get_unchecked::<Option<T>, _>(idx) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(column = idx, error = %e, "Failed to decode column");
                None
            }
        }
    }

    pub fn decode_column(row: &PgRow, idx: usize, declared: &PgTypeInfo) -> JsonValue {
        let resolved = resolve_domain(declared);
        let type_name = resolved.name().to_uppercase();

        let value = match categorize_type(&type_name) {
            TypeCategory::Integer => decode_integer(row, idx, &type_name),
            TypeCategory::Float => decode_float(row, idx, &type_name),
            TypeCategory::Decimal => {
                get::<BigDecimal>(row, idx).map(|v| JsonValue::String(v.to_string()))
            }
            TypeCategory::Boolean => get::<bool>(row, idx).map(JsonValue::Bool),
            TypeCategory::Text => decode_text(row, idx, &type_name),
            TypeCategory::Binary => get::<Vec<u8>>(row, idx).map(|v| encode_binary_value(&v)),
            TypeCategory::Json => get::<JsonValue>(row, idx),
            TypeCategory::Uuid => {
                get::<uuid::Uuid>(row, idx).map(|v| JsonValue::String(v.to_string()))
            }
            TypeCategory::Temporal => decode_temporal(row, idx, &type_name),
            TypeCategory::Array => decode_array(row, idx, &type_name),
            TypeCategory::Unknown => match resolved.kind() {
                // Enum labels travel as their text
                PgTypeKind::Enum(_) => get::<String>(row, idx).map(JsonValue::String),
                _ => {
                    tracing::debug!(
                        column = idx,
                        type_name = %type_name,
                        "Unsupported column type, returning null"
                    );
                    None
                }
            },
        };

        value.unwrap_or(JsonValue::Null)
    }

    fn decode_integer(row: &PgRow, idx: usize, type_name: &str) -> Option<JsonValue> {
        match type_name {
            "INT2" => get::<i16>(row, idx).map(JsonValue::from),
            "INT4" => get::<i32>(row, idx).map(JsonValue::from),
            "OID" => get::<Oid>(row, idx).map(|v| JsonValue::from(v.0)),
            _ => get::<i64>(row, idx).map(JsonValue::from),
        }
    }

    fn decode_float(row: &PgRow, idx: usize, type_name: &str) -> Option<JsonValue> {
        let v = match type_name {
            "FLOAT4" => get::<f32>(row, idx).map(f64::from)?,
            _ => get::<f64>(row, idx)?,
        };
        // NaN and infinities have no JSON number form
        Some(
            serde_json::Number::from_f64(v)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(v.to_string())),
        )
    }

    fn decode_text(row: &PgRow, idx: usize, type_name: &str) -> Option<JsonValue> {
        if type_name == "\"CHAR\"" {
            return get::<i8>(row, idx).map(|v| JsonValue::String((v as u8 as char).to_string()));
        }
        get::<String>(row, idx).map(JsonValue::String)
    }

    fn decode_temporal(row: &PgRow, idx: usize, type_name: &str) -> Option<JsonValue> {
        let text = match type_name {
            "DATE" => get::<NaiveDate>(row, idx)?.to_string(),
            "TIME" => get::<NaiveTime>(row, idx)?.to_string(),
            "TIMESTAMP" => get::<NaiveDateTime>(row, idx)?.to_string(),
            "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, idx)?.to_rfc3339(),
            "TIMETZ" => {
                let v = get::<PgTimeTz<NaiveTime, chrono::FixedOffset>>(row, idx)?;
                format!("{}{}", v.time, v.offset)
            }
            "INTERVAL" => format_interval(&get::<PgInterval>(row, idx)?),
            _ => return None,
        };
        Some(JsonValue::String(text))
    }

    fn decode_array(row: &PgRow, idx: usize, type_name: &str) -> Option<JsonValue> {
        let element = type_name.trim_end_matches("[]");
        match categorize_type(element) {
            TypeCategory::Integer => match element {
                "INT2" => get::<Vec<i16>>(row, idx).map(JsonValue::from),
                "INT4" => get::<Vec<i32>>(row, idx).map(JsonValue::from),
                "INT8" => get::<Vec<i64>>(row, idx).map(JsonValue::from),
                _ => None,
            },
            TypeCategory::Float => match element {
                "FLOAT8" => get::<Vec<f64>>(row, idx).map(JsonValue::from),
                _ => None,
            },
            TypeCategory::Boolean => get::<Vec<bool>>(row, idx).map(JsonValue::from),
            TypeCategory::Text if element != "\"CHAR\"" => {
                get::<Vec<String>>(row, idx).map(JsonValue::from)
            }
            _ => None,
        }
    }
}

/// Render an interval the way `psql` does for the common cases.
pub fn format_interval(interval: &PgInterval) -> String {
    let mut parts = Vec::new();
    let years = interval.months / 12;
    let months = interval.months % 12;
    if years != 0 {
        parts.push(format!("{} year{}", years, if years.abs() == 1 { "" } else { "s" }));
    }
    if months != 0 {
        parts.push(format!("{} mon{}", months, if months.abs() == 1 { "" } else { "s" }));
    }
    if interval.days != 0 {
        let days = interval.days;
        parts.push(format!("{} day{}", days, if days.abs() == 1 { "" } else { "s" }));
    }
    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros = interval.microseconds.unsigned_abs();
        let secs = micros / 1_000_000;
        let frac = micros % 1_000_000;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        );
        if frac != 0 {
            clock.push_str(&format!(".{:06}", frac));
        }
        parts.push(clock);
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(categorize_type("INT4"), TypeCategory::Integer);
        assert_eq!(categorize_type("int8"), TypeCategory::Integer);
        assert_eq!(categorize_type("OID"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_type_does_not_match_substrings() {
        assert_eq!(categorize_type("INTERVAL"), TypeCategory::Temporal);
        assert_eq!(categorize_type("POINT"), TypeCategory::Unknown);
        assert_eq!(categorize_type("TINTERVAL"), TypeCategory::Unknown);
    }

    #[test]
    fn test_categorize_type_decimal_and_text() {
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Decimal);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("NAME"), TypeCategory::Text);
        assert_eq!(categorize_type("\"CHAR\""), TypeCategory::Text);
    }

    #[test]
    fn test_categorize_type_json_uuid_arrays() {
        assert_eq!(categorize_type("jsonb"), TypeCategory::Json);
        assert_eq!(categorize_type("UUID"), TypeCategory::Uuid);
        assert_eq!(categorize_type("TEXT[]"), TypeCategory::Array);
        assert_eq!(categorize_type("TIMESTAMPTZ"), TypeCategory::Temporal);
    }

    #[test]
    fn test_encode_binary_value() {
        assert_eq!(
            encode_binary_value(b"hello world"),
            JsonValue::String("aGVsbG8gd29ybGQ=".to_string())
        );
        assert_eq!(encode_binary_value(&[]), JsonValue::String(String::new()));
    }

    #[test]
    fn test_format_interval() {
        let interval = PgInterval {
            months: 14,
            days: 3,
            microseconds: 3_723_000_000,
        };
        assert_eq!(format_interval(&interval), "1 year 2 mons 3 days 01:02:03");

        let zero = PgInterval {
            months: 0,
            days: 0,
            microseconds: 0,
        };
        assert_eq!(format_interval(&zero), "00:00:00");

        let fractional = PgInterval {
            months: 0,
            days: 1,
            microseconds: 1_500_000,
        };
        assert_eq!(format_interval(&fractional), "1 day 00:00:01.500000");
    }
}
