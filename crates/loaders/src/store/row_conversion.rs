use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Row, TypeInfo, ValueRef};

use crate::error::{ModelError, ModelResult};

/// Convert one cell of a PostgreSQL row to JSON.
///
/// Dispatches on the column's type name. A type with no decoder is an
/// error, never a null.
pub(super) fn cell_to_json(row: &PgRow, index: usize) -> ModelResult<JsonValue> {
    let type_name = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(JsonValue::Null);
        }
        raw.type_info().name().to_string()
    };

    let value = match type_name.as_str() {
        "BOOL" => JsonValue::Bool(row.try_get::<bool, _>(index)?),
        "INT2" => JsonValue::from(row.try_get::<i16, _>(index)?),
        "INT4" => JsonValue::from(row.try_get::<i32, _>(index)?),
        "INT8" => JsonValue::from(row.try_get::<i64, _>(index)?),
        "FLOAT4" => float_to_json(row.try_get::<f32, _>(index)? as f64),
        "FLOAT8" => float_to_json(row.try_get::<f64, _>(index)?),
        "NUMERIC" => decimal_to_json(row.try_get::<Decimal, _>(index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => JsonValue::String(row.try_get::<String, _>(index)?),
        "UUID" => JsonValue::String(row.try_get::<uuid::Uuid, _>(index)?.to_string()),
        "TIMESTAMPTZ" => JsonValue::String(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)?
                .to_rfc3339(),
        ),
        "TIMESTAMP" => {
            JsonValue::String(row.try_get::<chrono::NaiveDateTime, _>(index)?.to_string())
        }
        "DATE" => JsonValue::String(row.try_get::<chrono::NaiveDate, _>(index)?.to_string()),
        "TIME" => JsonValue::String(row.try_get::<chrono::NaiveTime, _>(index)?.to_string()),
        "JSON" | "JSONB" => row.try_get::<JsonValue, _>(index)?,
        other => {
            return Err(ModelError::Database(format!(
                "Cannot decode column {} of type {}",
                index, other
            )))
        }
    };

    Ok(value)
}

/// NaN and infinities have no JSON form; they come back as strings so
/// typed extractors reject them instead of reading a silent zero
fn float_to_json(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(value.to_string()))
}

/// Whole NUMERIC values within `i64` become JSON integers; anything else
/// keeps its exact decimal text
fn decimal_to_json(value: Decimal) -> JsonValue {
    if value.fract().is_zero() {
        if let Ok(whole) = i64::try_from(value) {
            return JsonValue::from(whole);
        }
    }
    JsonValue::String(value.normalize().to_string())
}
