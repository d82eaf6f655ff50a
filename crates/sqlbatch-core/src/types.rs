//! Typed values, schemas, rows and keys

use std::cmp::Ordering;

use crate::{BatchError, Result};

/// A database value.
///
/// `Null` only appears in raw engine output; rows and keys built through a
/// [`Schema`] never contain it.
#[derive(Debug, Clone)]
pub enum Value {
    /// NULL as reported by the engine
    Null,
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int32(_) => 1,
            Value::Int64(_) => 2,
            Value::Float32(_) => 3,
            Value::Float64(_) => 4,
            Value::String(_) => 5,
            Value::Bytes(_) => 6,
        }
    }
}

// Floats compare by IEEE total order so values can live in ordered key sets.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float32(a), Value::Float32(b)) => a.total_cmp(b),
            (Value::Float64(a), Value::Float64(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Float32(v) => v.to_bits().hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// Supported column types and their codec.
///
/// Each type knows which values it accepts for binding, how to turn a raw
/// engine value into a typed one, and what NULL reads as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Blob,
}

impl ValueType {
    /// Resolve a declared column type name.
    ///
    /// Unknown names are rejected here so no unsupported type reaches a
    /// statement at runtime.
    pub fn from_decl(decl: &str) -> Result<Self> {
        match decl.trim().to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" | "BIGINT" | "INT64" => Ok(ValueType::Int64),
            "INT32" | "SMALLINT" | "MEDIUMINT" => Ok(ValueType::Int32),
            "REAL" | "DOUBLE" | "FLOAT" | "FLOAT64" => Ok(ValueType::Float64),
            "FLOAT32" => Ok(ValueType::Float32),
            "TEXT" | "VARCHAR" | "CHAR" | "STRING" => Ok(ValueType::Text),
            "BLOB" | "BYTES" => Ok(ValueType::Blob),
            other => Err(BatchError::Configuration(format!(
                "unsupported column type '{}'",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Int32 => "INT32",
            ValueType::Int64 => "INTEGER",
            ValueType::Float32 => "FLOAT32",
            ValueType::Float64 => "REAL",
            ValueType::Text => "TEXT",
            ValueType::Blob => "BLOB",
        }
    }

    /// Whether `value` may be bound to a column of this type
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueType::Int32, Value::Int32(_))
                | (ValueType::Int64, Value::Int64(_))
                | (ValueType::Float32, Value::Float32(_))
                | (ValueType::Float64, Value::Float64(_))
                | (ValueType::Text, Value::String(_))
                | (ValueType::Blob, Value::Bytes(_))
        )
    }

    /// The value a NULL column reads as
    pub fn null_default(&self) -> Value {
        match self {
            ValueType::Int32 => Value::Int32(0),
            ValueType::Int64 => Value::Int64(0),
            ValueType::Float32 => Value::Float32(0.0),
            ValueType::Float64 => Value::Float64(0.0),
            ValueType::Text => Value::String(String::new()),
            ValueType::Blob => Value::Bytes(Vec::new()),
        }
    }

    /// Convert a raw engine value read from `column` into this type
    pub fn decode(&self, raw: Value, column: usize) -> Result<Value> {
        let mismatch = |raw: &Value| BatchError::Decode {
            column,
            message: format!("cannot read {:?} as {}", raw, self.name()),
        };

        let value = match (self, raw) {
            (_, Value::Null) => self.null_default(),
            (ValueType::Int32, Value::Int32(v)) => Value::Int32(v),
            (ValueType::Int32, Value::Int64(v)) => {
                Value::Int32(i32::try_from(v).map_err(|_| BatchError::Decode {
                    column,
                    message: format!("integer {} out of range for INT32", v),
                })?)
            }
            (ValueType::Int64, Value::Int64(v)) => Value::Int64(v),
            (ValueType::Int64, Value::Int32(v)) => Value::Int64(v as i64),
            (ValueType::Float32, Value::Float32(v)) => Value::Float32(v),
            (ValueType::Float32, Value::Float64(v)) => Value::Float32(v as f32),
            (ValueType::Float32, Value::Int64(v)) => Value::Float32(v as f32),
            (ValueType::Float64, Value::Float64(v)) => Value::Float64(v),
            (ValueType::Float64, Value::Float32(v)) => Value::Float64(v as f64),
            (ValueType::Float64, Value::Int64(v)) => Value::Float64(v as f64),
            (ValueType::Float64, Value::Int32(v)) => Value::Float64(v as f64),
            (ValueType::Text, Value::String(s)) => Value::String(s),
            (ValueType::Text, Value::Bytes(b)) => {
                Value::String(String::from_utf8(b).map_err(|e| BatchError::Decode {
                    column,
                    message: format!("blob is not valid UTF-8: {}", e),
                })?)
            }
            (ValueType::Text, other @ (Value::Int32(_) | Value::Int64(_))) => {
                Value::String(other.to_string())
            }
            (ValueType::Blob, Value::Bytes(b)) => Value::Bytes(b),
            (ValueType::Blob, Value::String(s)) => Value::Bytes(s.into_bytes()),
            (_, other) => return Err(mismatch(&other)),
        };
        Ok(value)
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub value_type: ValueType,
}

/// Fixed-arity row layout declared once and checked at row construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ValueType)>,
        S: Into<String>,
    {
        let columns: Vec<ColumnDef> = columns
            .into_iter()
            .map(|(name, value_type)| ColumnDef {
                name: name.into(),
                value_type,
            })
            .collect();

        if columns.is_empty() {
            return Err(BatchError::Configuration(
                "schema must declare at least one column".into(),
            ));
        }
        if let Some(col) = columns.iter().find(|c| c.name.is_empty()) {
            return Err(BatchError::Configuration(format!(
                "column of type {} has an empty name",
                col.value_type.name()
            )));
        }

        Ok(Self { columns })
    }

    /// Build a schema from `(name, declared type)` pairs, e.g. `("id", "INTEGER")`
    pub fn from_decls(decls: &[(&str, &str)]) -> Result<Self> {
        let columns = decls
            .iter()
            .map(|(name, decl)| ValueType::from_decl(decl).map(|t| (*name, t)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Check arity and per-column types of `values`
    pub fn validate(&self, values: &[Value]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(BatchError::SchemaMismatch(format!(
                "expected {} values, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        for (idx, (col, value)) in self.columns.iter().zip(values).enumerate() {
            if !col.value_type.accepts(value) {
                return Err(BatchError::SchemaMismatch(format!(
                    "column {} (`{}`) expects {}, got {:?}",
                    idx,
                    col.name,
                    col.value_type.name(),
                    value
                )));
            }
        }
        Ok(())
    }

    pub fn row(&self, values: Vec<Value>) -> Result<Row> {
        self.validate(&values)?;
        Ok(Row { values })
    }

    pub fn key(&self, values: Vec<Value>) -> Result<Key> {
        self.validate(&values)?;
        Ok(Key(values))
    }

    /// Decode a raw engine row through each column's codec
    pub(crate) fn decode_row(&self, raw: Vec<Value>) -> Result<Row> {
        if raw.len() < self.columns.len() {
            return Err(BatchError::Decode {
                column: raw.len(),
                message: format!(
                    "engine returned {} columns, schema declares {}",
                    raw.len(),
                    self.columns.len()
                ),
            });
        }
        let values = self
            .columns
            .iter()
            .zip(raw)
            .enumerate()
            .map(|(idx, (col, value))| col.value_type.decode(value, idx))
            .collect::<Result<Vec<_>>>()?;
        Ok(Row { values })
    }
}

/// A row whose arity and types were checked against a [`Schema`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An ordered lookup key tuple; equal keys collapse in a pending key set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<Value>);

impl Key {
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_schema_rejects_empty_and_unknown_types() {
        let empty: Vec<(&str, ValueType)> = vec![];
        assert!(matches!(
            Schema::new(empty),
            Err(BatchError::Configuration(_))
        ));
        assert!(matches!(
            Schema::from_decls(&[("price", "DECIMAL")]),
            Err(BatchError::Configuration(_))
        ));
    }

    #[test]
    fn test_row_construction_checks_arity_and_types() {
        let schema = Schema::from_decls(&[("name", "TEXT"), ("n", "INTEGER")]).unwrap();
        assert!(schema.row(vec!["a".into(), 1i64.into()]).is_ok());
        assert!(matches!(
            schema.row(vec!["a".into()]),
            Err(BatchError::SchemaMismatch(_))
        ));
        assert!(matches!(
            schema.row(vec![1i64.into(), "a".into()]),
            Err(BatchError::SchemaMismatch(_))
        ));
        assert!(matches!(
            schema.row(vec!["a".into(), Value::Null]),
            Err(BatchError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_decode_maps_null_to_type_default() {
        assert_eq!(ValueType::Text.decode(Value::Null, 0).unwrap(), Value::from(""));
        assert_eq!(ValueType::Int32.decode(Value::Null, 0).unwrap(), Value::Int32(0));
        assert_eq!(
            ValueType::Blob.decode(Value::Null, 0).unwrap(),
            Value::Bytes(vec![])
        );
        assert_eq!(
            ValueType::Int32.decode(Value::Int64(7), 0).unwrap(),
            Value::Int32(7)
        );
        assert!(matches!(
            ValueType::Int32.decode(Value::Int64(i64::MAX), 3),
            Err(BatchError::Decode { column: 3, .. })
        ));
        assert!(ValueType::Int64.decode(Value::Bytes(vec![1]), 0).is_err());
    }

    #[test]
    fn test_keys_dedup_in_ordered_set() {
        let schema = Schema::new([("a", ValueType::Int64), ("b", ValueType::Float64)]).unwrap();
        let mut keys = BTreeSet::new();
        keys.insert(schema.key(vec![2i64.into(), 0.5f64.into()]).unwrap());
        keys.insert(schema.key(vec![1i64.into(), 0.5f64.into()]).unwrap());
        keys.insert(schema.key(vec![2i64.into(), 0.5f64.into()]).unwrap());
        assert_eq!(keys.len(), 2);
        let first = keys.first().unwrap();
        assert_eq!(first.values()[0], Value::Int64(1));
    }

    #[test]
    fn test_float_total_order() {
        assert!(Value::Float64(-0.0) < Value::Float64(0.0));
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
    }
}
