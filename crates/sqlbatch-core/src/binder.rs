//! Tuple binding onto consecutive statement positions

use crate::{Result, Statement, Value};

/// Bind `values` to consecutive 1-based positions starting at `first_position`.
///
/// Binding is strictly in order and stops at the first failure; positions
/// after the failing one are left unbound. Returns the next free position.
pub fn bind_tuple<S>(statement: &mut S, first_position: usize, values: &[Value]) -> Result<usize>
where
    S: Statement + ?Sized,
{
    let mut position = first_position;
    for value in values {
        statement.bind(position, value)?;
        position += 1;
    }
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BatchError, Step};

    #[derive(Default)]
    struct RecordingStatement {
        bound: Vec<(usize, Value)>,
        fail_at: Option<usize>,
    }

    impl Statement for RecordingStatement {
        fn bind(&mut self, position: usize, value: &Value) -> Result<()> {
            if self.fail_at == Some(position) {
                return Err(BatchError::bind(position, "rejected"));
            }
            self.bound.push((position, value.clone()));
            Ok(())
        }

        fn step(&mut self) -> Result<Step> {
            Ok(Step::Done)
        }
    }

    #[test]
    fn test_binds_consecutive_positions() {
        let mut stmt = RecordingStatement::default();
        let next = bind_tuple(&mut stmt, 3, &["a".into(), 2i64.into()]).unwrap();
        assert_eq!(next, 5);
        assert_eq!(
            stmt.bound,
            vec![(3, Value::from("a")), (4, Value::Int64(2))]
        );
    }

    #[test]
    fn test_stops_at_first_failure() {
        let mut stmt = RecordingStatement {
            fail_at: Some(2),
            ..Default::default()
        };
        let err = bind_tuple(&mut stmt, 1, &[1i64.into(), 2i64.into(), 3i64.into()]).unwrap_err();
        assert_eq!(err, BatchError::bind(2, "rejected"));
        assert_eq!(stmt.bound, vec![(1, Value::Int64(1))]);
    }
}
