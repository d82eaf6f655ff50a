//! Error and status types for sqlbatch

use thiserror::Error;

/// Core error type for buffered query operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    /// A single row or key does not fit the engine ceilings on its own
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Prepare error: {message} (sql: {sql_preview})")]
    Prepare { sql_preview: String, message: String },

    #[error("Bind error at position {position}: {message}")]
    Bind { position: usize, message: String },

    #[error("Step error: {0}")]
    Step(String),

    #[error("Decode error in column {column}: {message}")]
    Decode { column: usize, message: String },

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),
}

impl BatchError {
    /// Build a prepare error, keeping only a short preview of the statement text
    pub fn prepare(sql: &str, message: impl Into<String>) -> Self {
        BatchError::Prepare {
            sql_preview: sql_preview(sql),
            message: message.into(),
        }
    }

    pub fn bind(position: usize, message: impl Into<String>) -> Self {
        BatchError::Bind {
            position,
            message: message.into(),
        }
    }

    /// The copyable classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BatchError::Configuration(_) => ErrorKind::Configuration,
            BatchError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            BatchError::Prepare { .. } => ErrorKind::Prepare,
            BatchError::Bind { .. } => ErrorKind::Bind,
            BatchError::Step(_) => ErrorKind::Step,
            BatchError::Decode { .. } => ErrorKind::Decode,
            BatchError::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
        }
    }
}

/// Result type alias for buffered query operations
pub type Result<T> = std::result::Result<T, BatchError>;

/// Classification of a [`BatchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    SchemaMismatch,
    Prepare,
    Bind,
    Step,
    Decode,
    EngineUnavailable,
}

/// Outcome of the most recent operation on an accumulator, cursor or query.
///
/// Each instance owns its status; it is never shared between values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Nothing has failed and no work is pending
    #[default]
    Ok,
    /// The last step produced a row
    Row,
    /// The last operation ran to completion
    Done,
    /// The last operation failed
    Failed(ErrorKind),
}

impl Status {
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed(_))
    }
}

impl From<&BatchError> for Status {
    fn from(err: &BatchError) -> Self {
        Status::Failed(err.kind())
    }
}

pub(crate) fn sql_preview(sql: &str) -> String {
    sql.chars().take(100).collect()
}
