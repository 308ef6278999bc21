//! Row decoding - Postgres rows to open JSON records
//!
//! Reports pass warehouse rows through untouched, so decoding is driven by
//! the column types the warehouse reports rather than by a Rust struct.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{json, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Decode, Postgres, Row, Type, TypeInfo};

use salesctl_core::{QueryError, Record};

/// Decode every column of a row into a record.
pub fn row_to_record(row: &PgRow) -> Result<Record, QueryError> {
    let mut record = Record::new();

    for (index, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, index, column.type_info().name())
            .map_err(|e| QueryError::execution(format!("column '{}': {}", column.name(), e)))?;
        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<Value, String> {
    match type_name {
        "BOOL" => get::<bool>(row, index).map(|v| json!(v)),
        "INT2" => get::<i16>(row, index).map(|v| json!(v)),
        "INT4" => get::<i32>(row, index).map(|v| json!(v)),
        "INT8" => get::<i64>(row, index).map(|v| json!(v)),
        "FLOAT4" => get::<f32>(row, index).map(|v| json!(v)),
        "FLOAT8" => get::<f64>(row, index).map(|v| json!(v)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => get::<String>(row, index).map(|v| json!(v)),
        "DATE" => get::<NaiveDate>(row, index).map(|v| json!(v)),
        "TIMESTAMP" => get::<NaiveDateTime>(row, index).map(|v| json!(v)),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index).map(|v| json!(v)),
        "JSON" | "JSONB" => get::<Value>(row, index).map(|v| v.unwrap_or(Value::Null)),
        "INT4[]" => get::<Vec<i32>>(row, index).map(|v| json!(v)),
        "INT8[]" => get::<Vec<i64>>(row, index).map(|v| json!(v)),
        "TEXT[]" | "VARCHAR[]" => get::<Vec<String>>(row, index).map(|v| json!(v)),
        "NUMERIC" => Err("NUMERIC is not decoded; cast it to float8 or text in the template".into()),
        "VOID" => Ok(Value::Null),
        other => Err(format!("unsupported column type {}", other)),
    }
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<Option<T>, String>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index).map_err(|e| e.to_string())
}
