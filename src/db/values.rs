//! Conversion of PostgreSQL result rows into JSON records.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgHasArrayType, PgRow};
use sqlx::{Column, Postgres, Row, TypeInfo};

use super::GatewayError;

/// How a result column is decoded, derived from its PostgreSQL type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,
    Json,
    BoolArray,
    Int2Array,
    Int4Array,
    Int8Array,
    Float4Array,
    Float8Array,
    NumericArray,
    TextArray,
    DateArray,
    Unsupported,
}

impl ColumnKind {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "BOOL" => ColumnKind::Bool,
            "INT2" => ColumnKind::Int2,
            "INT4" => ColumnKind::Int4,
            "INT8" => ColumnKind::Int8,
            "FLOAT4" => ColumnKind::Float4,
            "FLOAT8" => ColumnKind::Float8,
            "NUMERIC" => ColumnKind::Numeric,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" | "UNKNOWN" => ColumnKind::Text,
            "DATE" => ColumnKind::Date,
            "TIME" => ColumnKind::Time,
            "TIMESTAMP" => ColumnKind::Timestamp,
            "TIMESTAMPTZ" => ColumnKind::TimestampTz,
            "INTERVAL" => ColumnKind::Interval,
            "JSON" | "JSONB" => ColumnKind::Json,
            "BOOL[]" => ColumnKind::BoolArray,
            "INT2[]" => ColumnKind::Int2Array,
            "INT4[]" => ColumnKind::Int4Array,
            "INT8[]" => ColumnKind::Int8Array,
            "FLOAT4[]" => ColumnKind::Float4Array,
            "FLOAT8[]" => ColumnKind::Float8Array,
            "NUMERIC[]" => ColumnKind::NumericArray,
            "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => ColumnKind::TextArray,
            "DATE[]" => ColumnKind::DateArray,
            _ => ColumnKind::Unsupported,
        }
    }
}

/// Maps one row to `{column: value}`, keeping the result's column order.
///
/// A column whose type cannot be represented fails the whole row rather than
/// turning into `null`.
pub fn row_to_json(row: &PgRow) -> Result<Map<String, Value>, GatewayError> {
    let mut record = Map::with_capacity(row.len());

    for column in row.columns() {
        let type_name = column.type_info().name();
        let kind = ColumnKind::from_type_name(type_name);

        let value = column_value(row, column.ordinal(), kind, type_name).map_err(|source| {
            GatewayError::Decode {
                column: column.name().to_string(),
                source,
            }
        })?;
        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

fn column_value(
    row: &PgRow,
    index: usize,
    kind: ColumnKind,
    type_name: &str,
) -> Result<Value, sqlx::Error> {
    let value = match kind {
        ColumnKind::Bool => Value::from(row.try_get::<Option<bool>, _>(index)?),
        ColumnKind::Int2 => Value::from(row.try_get::<Option<i16>, _>(index)?),
        ColumnKind::Int4 => Value::from(row.try_get::<Option<i32>, _>(index)?),
        ColumnKind::Int8 => Value::from(row.try_get::<Option<i64>, _>(index)?),
        ColumnKind::Float4 => Value::from(row.try_get::<Option<f32>, _>(index)?),
        ColumnKind::Float8 => Value::from(row.try_get::<Option<f64>, _>(index)?),
        ColumnKind::Numeric => row
            .try_get::<Option<Decimal>, _>(index)?
            .map_or(Value::Null, decimal_to_json),
        ColumnKind::Text => Value::from(row.try_get::<Option<String>, _>(index)?),
        ColumnKind::Date => Value::from(
            row.try_get::<Option<chrono::NaiveDate>, _>(index)?
                .map(date_to_string),
        ),
        ColumnKind::Time => Value::from(
            row.try_get::<Option<chrono::NaiveTime>, _>(index)?
                .map(|t| t.format("%H:%M:%S%.f").to_string()),
        ),
        ColumnKind::Timestamp => Value::from(
            row.try_get::<Option<chrono::NaiveDateTime>, _>(index)?
                .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        ),
        ColumnKind::TimestampTz => Value::from(
            row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)?
                .map(|ts| ts.to_rfc3339()),
        ),
        ColumnKind::Interval => Value::from(
            row.try_get::<Option<PgInterval>, _>(index)?
                .map(|interval| interval_to_iso8601(&interval)),
        ),
        ColumnKind::Json => row
            .try_get::<Option<Value>, _>(index)?
            .unwrap_or(Value::Null),
        ColumnKind::BoolArray => array_value::<bool>(row, index, Value::from)?,
        ColumnKind::Int2Array => array_value::<i16>(row, index, Value::from)?,
        ColumnKind::Int4Array => array_value::<i32>(row, index, Value::from)?,
        ColumnKind::Int8Array => array_value::<i64>(row, index, Value::from)?,
        ColumnKind::Float4Array => array_value::<f32>(row, index, Value::from)?,
        ColumnKind::Float8Array => array_value::<f64>(row, index, Value::from)?,
        ColumnKind::NumericArray => array_value::<Decimal>(row, index, decimal_to_json)?,
        ColumnKind::TextArray => array_value::<String>(row, index, Value::from)?,
        ColumnKind::DateArray => {
            array_value::<chrono::NaiveDate>(row, index, |d| Value::from(date_to_string(d)))?
        }
        ColumnKind::Unsupported => {
            return Err(sqlx::Error::Decode(
                format!("unsupported column type {}", type_name).into(),
            ))
        }
    };

    Ok(value)
}

/// One-dimensional arrays become JSON arrays; NULL elements stay `null`.
fn array_value<T>(row: &PgRow, index: usize, to_json: fn(T) -> Value) -> Result<Value, sqlx::Error>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres> + PgHasArrayType,
{
    let items = row.try_get::<Option<Vec<Option<T>>>, _>(index)?;
    Ok(items.map_or(Value::Null, |items| {
        Value::Array(
            items
                .into_iter()
                .map(|item| item.map_or(Value::Null, to_json))
                .collect(),
        )
    }))
}

fn date_to_string(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Numerics become JSON numbers; values outside `f64` fall back to their text form.
pub fn decimal_to_json(decimal: Decimal) -> Value {
    match decimal.to_f64() {
        Some(number) => Value::from(number),
        None => Value::String(decimal.to_string()),
    }
}

/// Renders an interval as an ISO-8601 duration, e.g. `P1Y2M3DT4H5M6.5S`.
///
/// Components keep PostgreSQL's own signs, so `-1 day +02:00` is `P-1DT2H`.
pub fn interval_to_iso8601(interval: &PgInterval) -> String {
    let years = interval.months / 12;
    let months = interval.months % 12;
    let hours = interval.microseconds / 3_600_000_000;
    let minutes = (interval.microseconds % 3_600_000_000) / 60_000_000;
    let second_micros = interval.microseconds % 60_000_000;

    let mut duration = String::from("P");
    if years != 0 {
        duration.push_str(&format!("{}Y", years));
    }
    if months != 0 {
        duration.push_str(&format!("{}M", months));
    }
    if interval.days != 0 {
        duration.push_str(&format!("{}D", interval.days));
    }
    if hours != 0 || minutes != 0 || second_micros != 0 {
        duration.push('T');
        if hours != 0 {
            duration.push_str(&format!("{}H", hours));
        }
        if minutes != 0 {
            duration.push_str(&format!("{}M", minutes));
        }
        if second_micros != 0 {
            duration.push_str(&format!("{}S", seconds_to_string(second_micros)));
        }
    }

    if duration == "P" {
        duration.push_str("T0S");
    }
    duration
}

fn seconds_to_string(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    let (whole, fraction) = (abs / 1_000_000, abs % 1_000_000);
    if fraction == 0 {
        format!("{}{}", sign, whole)
    } else {
        let fraction = format!("{:06}", fraction);
        format!("{}{}.{}", sign, whole, fraction.trim_end_matches('0'))
    }
}
