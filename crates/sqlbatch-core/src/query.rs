//! Single prepared statement with typed, lazily read rows

use crate::binder::bind_tuple;
use crate::{BatchError, Engine, Result, Row, Schema, Statement, Status, Step, Value};

/// A plain, unbuffered query.
///
/// Bind parameters by 1-based position, then read rows one at a time; each
/// raw row is decoded through `schema`, so NULL columns read as their type's
/// default.
pub struct TypedQuery<'e, E: Engine + 'e> {
    statement: Option<E::Statement<'e>>,
    schema: Schema,
    status: Status,
    rows_read: usize,
}

impl<'e, E: Engine + 'e> TypedQuery<'e, E> {
    pub fn new(engine: &'e E, sql: &str, schema: Schema) -> Result<Self> {
        tracing::trace!(sql_preview = %sql.chars().take(100).collect::<String>(), "preparing query");
        let statement = engine.prepare(sql)?;
        Ok(Self {
            statement: Some(statement),
            schema,
            status: Status::Ok,
            rows_read: 0,
        })
    }

    pub fn bind(&mut self, position: usize, value: &Value) -> Result<()> {
        let result = self.active()?.bind(position, value);
        self.record(result)
    }

    /// Bind `values` to consecutive positions from `first_position`
    pub fn bind_tuple(&mut self, first_position: usize, values: &[Value]) -> Result<usize> {
        let result = bind_tuple(self.active()?, first_position, values);
        self.record(result)
    }

    /// Step to the next row; `Ok(None)` once the statement is done
    pub fn advance(&mut self) -> Result<Option<Row>> {
        let Some(stmt) = self.statement.as_mut() else {
            return Ok(None);
        };
        let row = match stmt.step() {
            Ok(Step::Row(raw)) => self.schema.decode_row(raw).map(Some),
            Ok(Step::Done) => Ok(None),
            Err(e) => Err(e),
        };

        match &row {
            Ok(Some(_)) => {
                self.rows_read += 1;
                self.status = Status::Row;
            }
            Ok(None) => {
                self.statement = None;
                self.status = Status::Done;
            }
            Err(e) => {
                self.statement = None;
                self.status = Status::from(e);
            }
        }
        row
    }

    /// Step until done, discarding rows; returns how many rows were stepped over
    pub fn run(&mut self) -> Result<usize> {
        let mut count = 0;
        while self.advance()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    pub fn is_done(&self) -> bool {
        self.statement.is_none()
    }

    fn active(&mut self) -> Result<&mut E::Statement<'e>> {
        self.statement
            .as_mut()
            .ok_or_else(|| BatchError::Step("query already ran to completion".into()))
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.status = Status::from(e);
        }
        result
    }
}

impl<'e, E: Engine + 'e> Iterator for TypedQuery<'e, E> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.advance().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;
    use crate::{ErrorKind, ResourceCeilings, ValueType};

    fn engine() -> MockEngine {
        MockEngine::with_rows(ResourceCeilings::new(1000, 10, 10), |_, params| {
            params.iter().map(|p| vec![p.clone(), Value::Null]).collect()
        })
    }

    fn schema() -> Schema {
        Schema::new([("v", ValueType::Int64), ("note", ValueType::Text)]).unwrap()
    }

    #[test]
    fn test_binds_and_reads_typed_rows() {
        let engine = engine();
        let mut query = TypedQuery::new(&engine, "SELECT ?, NULL UNION ALL SELECT ?, NULL", schema()).unwrap();
        assert_eq!(query.bind_tuple(1, &[Value::Int64(4), Value::Int64(5)]).unwrap(), 3);

        let rows: Vec<Row> = query.by_ref().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].values(), &[Value::Int64(5), Value::String(String::new())]);
        assert_eq!(query.status(), Status::Done);
        assert!(query.is_done());
        assert_eq!(query.rows_read(), 2);
    }

    #[test]
    fn test_bind_after_completion_fails() {
        let engine = engine();
        let mut query = TypedQuery::new(&engine, "SELECT 1", schema()).unwrap();
        assert_eq!(query.run().unwrap(), 0);
        let err = query.bind(1, &Value::Int64(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Step);
    }

    fn first_value<'e, E: Engine>(engine: &'e E, value: Value, schema: Schema) -> Result<Option<Value>> {
        let mut query = TypedQuery::new(engine, "SELECT ?, NULL", schema)?;
        query.bind(1, &value)?;
        Ok(query.advance()?.and_then(|row| row.get(0).cloned()))
    }

    #[test]
    fn test_query_usable_from_engine_generic_code() {
        let engine = engine();
        let value = first_value(&engine, Value::Int64(42), schema()).unwrap();
        assert_eq!(value, Some(Value::Int64(42)));
    }

    #[test]
    fn test_bind_failure_recorded_in_status() {
        let engine = engine();
        engine.fail_bind_position.set(Some(1));
        let mut query = TypedQuery::new(&engine, "SELECT ?", schema()).unwrap();
        assert!(query.bind(1, &Value::Int64(1)).is_err());
        assert_eq!(query.status(), Status::Failed(ErrorKind::Bind));
    }
}
