//! Engine and statement traits the buffered queries are built on

use crate::{Result, Value};

/// Engine-imposed maximums bounding one generated statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCeilings {
    /// Maximum statement text length in bytes
    pub max_sql_length: usize,
    /// Maximum number of bound parameters
    pub max_variable_number: usize,
    /// Maximum number of terms in one compound statement
    pub max_compound_terms: usize,
}

impl ResourceCeilings {
    pub const fn new(
        max_sql_length: usize,
        max_variable_number: usize,
        max_compound_terms: usize,
    ) -> Self {
        Self {
            max_sql_length,
            max_variable_number,
            max_compound_terms,
        }
    }
}

/// Result of stepping a prepared statement
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// One raw result row
    Row(Vec<Value>),
    /// The statement ran to completion
    Done,
}

/// A prepared statement.
///
/// Positions are 1-based. A statement is prepared, bound and stepped exactly
/// once; it is never reused with stale bindings.
pub trait Statement {
    fn bind(&mut self, position: usize, value: &Value) -> Result<()>;

    fn step(&mut self) -> Result<Step>;
}

/// A database engine that reports its ceilings and prepares statements
pub trait Engine {
    type Statement<'e>: Statement
    where
        Self: 'e;

    /// Current resource ceilings; callers query this once and cache it
    fn ceilings(&self) -> Result<ResourceCeilings>;

    fn prepare(&self, sql: &str) -> Result<Self::Statement<'_>>;
}
