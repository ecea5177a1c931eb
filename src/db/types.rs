//! PostgreSQL to JSON value mapping.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Per-category decoders handle the actual value extraction
//!
//! Columns with no dedicated decoder (arrays, enums, intervals, network
//! types, oids) are returned as their PostgreSQL text rendering.
//!
//! A value that fails to decode becomes `null` and is logged; one odd
//! column never fails the whole statement after it has been committed.

use crate::models::JsonRow;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::{Column, Decode, Postgres, Row, Type, TypeInfo};

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
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Unknown,
}

/// Classify a PostgreSQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Arrays of any element type render as text literals like `{1,2}`
    if lower.ends_with("[]") || lower.starts_with('_') {
        return TypeCategory::Unknown;
    }

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    match lower.as_str() {
        "int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" | "serial" | "bigserial" => {
            TypeCategory::Integer
        }
        "bool" | "boolean" => TypeCategory::Boolean,
        "float4" | "float8" | "real" | "double precision" => TypeCategory::Float,
        "json" | "jsonb" => TypeCategory::Json,
        "uuid" => TypeCategory::Uuid,
        "bytea" => TypeCategory::Binary,
        "timestamptz" => TypeCategory::TimestampTz,
        "timestamp" => TypeCategory::Timestamp,
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        "text" | "varchar" | "bpchar" | "char" | "name" | "citext" => TypeCategory::Text,
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
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
// Row to JSON
// =============================================================================

/// Convert a PostgreSQL row into a JSON object keyed by column name.
pub fn row_to_json(row: &PgRow) -> JsonRow {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let type_name = col.type_info().name();
            let value = decode_column(row, idx, categorize_type(type_name));
            (col.name().to_string(), value)
        })
        .collect()
}

fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
    match category {
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Boolean => decode_boolean(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Binary => decode_binary(row, idx),
        TypeCategory::Json => decode_json(row, idx),
        TypeCategory::Uuid => decode_uuid(row, idx),
        TypeCategory::Timestamp => decode_timestamp(row, idx),
        TypeCategory::TimestampTz => decode_timestamptz(row, idx),
        TypeCategory::Date => decode_date(row, idx),
        TypeCategory::Time => decode_time(row, idx),
        TypeCategory::Text => decode_text(row, idx),
        TypeCategory::Unknown => decode_raw_text(row, idx),
    }
}

/// Log a decode failure and fall back to null.
fn or_null<T>(
    result: Result<Option<T>, sqlx::Error>,
    idx: usize,
    map: impl FnOnce(T) -> JsonValue,
) -> JsonValue {
    match result {
        Ok(Some(v)) => map(v),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::warn!(column = idx, error = %e, "Failed to decode column value");
            JsonValue::Null
        }
    }
}

fn decode_decimal(row: &PgRow, idx: usize) -> JsonValue {
    or_null(row.try_get::<Option<RawDecimal>, _>(idx), idx, |v| {
        JsonValue::String(v.0)
    })
}

fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
    }
    or_null(row.try_get::<Option<i64>, _>(idx), idx, |v| {
        JsonValue::Number(v.into())
    })
}

fn decode_boolean(row: &PgRow, idx: usize) -> JsonValue {
    or_null(row.try_get::<Option<bool>, _>(idx), idx, JsonValue::Bool)
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(|v| float_value(v as f64)).unwrap_or(JsonValue::Null);
    }
    or_null(row.try_get::<Option<f64>, _>(idx), idx, float_value)
}

fn decode_binary(row: &PgRow, idx: usize) -> JsonValue {
    or_null(row.try_get::<Option<Vec<u8>>, _>(idx), idx, |v| {
        encode_binary_value(&v)
    })
}

fn decode_json(row: &PgRow, idx: usize) -> JsonValue {
    or_null(row.try_get::<Option<JsonValue>, _>(idx), idx, |v| v)
}

fn decode_uuid(row: &PgRow, idx: usize) -> JsonValue {
    or_null(row.try_get::<Option<uuid::Uuid>, _>(idx), idx, |v| {
        JsonValue::String(v.to_string())
    })
}

fn decode_timestamp(row: &PgRow, idx: usize) -> JsonValue {
    or_null(
        row.try_get::<Option<chrono::NaiveDateTime>, _>(idx),
        idx,
        |v| JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
    )
}

fn decode_timestamptz(row: &PgRow, idx: usize) -> JsonValue {
    or_null(
        row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx),
        idx,
        |v| JsonValue::String(v.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)),
    )
}

fn decode_date(row: &PgRow, idx: usize) -> JsonValue {
    or_null(row.try_get::<Option<chrono::NaiveDate>, _>(idx), idx, |v| {
        JsonValue::String(v.to_string())
    })
}

fn decode_time(row: &PgRow, idx: usize) -> JsonValue {
    or_null(row.try_get::<Option<chrono::NaiveTime>, _>(idx), idx, |v| {
        JsonValue::String(v.to_string())
    })
}

fn decode_text(row: &PgRow, idx: usize) -> JsonValue {
    or_null(row.try_get::<Option<String>, _>(idx), idx, JsonValue::String)
}

/// Simple-query results arrive in text format, so the raw bytes are the
/// server's own rendering of the value regardless of its type.
fn decode_raw_text(row: &PgRow, idx: usize) -> JsonValue {
    or_null(
        row.try_get_unchecked::<Option<String>, _>(idx),
        idx,
        JsonValue::String,
    )
}
