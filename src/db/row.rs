//! Decode PostgreSQL rows into JSON maps.

use super::Row;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

/// Decode every column. A column whose type has no JSON mapping is an error, never a
/// silent `null`; cast it in SQL (`col::text`) to read it.
pub fn row_to_map(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut map = Row::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name)?);
    }
    Ok(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(name)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    if let Ok(n) = row.try_get::<i16, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<i32, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<i64, _>(name) {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = row.try_get::<f32, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Ok(Value::Number(n));
        }
    }
    if let Ok(n) = row.try_get::<f64, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Ok(Value::Number(n));
        }
    }
    if let Ok(b) = row.try_get::<bool, _>(name) {
        return Ok(Value::Bool(b));
    }
    if let Ok(u) = row.try_get::<uuid::Uuid, _>(name) {
        return Ok(Value::String(u.to_string()));
    }
    if let Ok(d) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(name) {
        return Ok(Value::String(d.to_rfc3339()));
    }
    if let Ok(d) = row.try_get::<chrono::NaiveDateTime, _>(name) {
        return Ok(Value::String(d.format("%Y-%m-%d %H:%M:%S%.f").to_string()));
    }
    if let Ok(d) = row.try_get::<chrono::NaiveDate, _>(name) {
        return Ok(Value::String(d.format("%Y-%m-%d").to_string()));
    }
    if let Ok(t) = row.try_get::<chrono::NaiveTime, _>(name) {
        return Ok(Value::String(t.format("%H:%M:%S%.f").to_string()));
    }
    if let Ok(s) = row.try_get::<String, _>(name) {
        return Ok(Value::String(s));
    }
    if let Ok(j) = row.try_get::<Value, _>(name) {
        return Ok(j);
    }
    Err(sqlx::Error::ColumnDecode {
        index: name.to_string(),
        source: format!("no JSON mapping for column type {}; cast it to text", type_name).into(),
    })
}
