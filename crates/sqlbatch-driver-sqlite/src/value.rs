//! Conversion between sqlbatch values and rusqlite values

use sqlbatch_core::{BatchError, Result, Value};

pub(crate) fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Int32(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int64(i) => rusqlite::types::Value::Integer(*i),
        Value::Float32(f) => rusqlite::types::Value::Real(*f as f64),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

/// Convert rusqlite row value to our Value type
pub(crate) fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row.get_ref(idx).map_err(|e| BatchError::Decode {
        column: idx,
        message: e.to_string(),
    })?;

    // Storage classes map one to one; the schema codec converts afterwards.
    // TEXT that is not valid UTF-8 is passed on as bytes so the codec rejects it.
    let value = match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => match std::str::from_utf8(s) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => Value::Bytes(s.to_vec()),
        },
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    };

    Ok(value)
}
