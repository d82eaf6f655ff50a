//! SQLite engine implementation

use rusqlite::limits::Limit;
use rusqlite::{Connection, OpenFlags};
use sqlbatch_core::{BatchError, Engine, ResourceCeilings, Result, Statement, Step, Value};
use std::collections::VecDeque;

use crate::config::SqliteConfig;
use crate::value::{rusqlite_to_value, value_to_rusqlite};

/// Run-time limits that bound compound statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    /// Maximum length of SQL text in bytes
    SqlLength,
    /// Largest bound parameter index
    VariableNumber,
    /// Maximum number of terms in a compound SELECT
    CompoundSelect,
}

impl LimitKind {
    fn as_rusqlite(self) -> Limit {
        match self {
            LimitKind::SqlLength => Limit::SQLITE_LIMIT_SQL_LENGTH,
            LimitKind::VariableNumber => Limit::SQLITE_LIMIT_VARIABLE_NUMBER,
            LimitKind::CompoundSelect => Limit::SQLITE_LIMIT_COMPOUND_SELECT,
        }
    }
}

/// SQLite database engine backed by a single rusqlite connection.
///
/// Ceilings are read from the connection's run-time limits every time they
/// are requested, so `set_limit` takes effect on the next flush or pull.
pub struct SqliteEngine {
    conn: Option<Connection>,
    path: String,
}

impl SqliteEngine {
    /// Open a SQLite database with default settings
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with_config(&SqliteConfig::new(path))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    #[tracing::instrument(skip(config), fields(path = %config.path))]
    pub fn open_with_config(config: &SqliteConfig) -> Result<Self> {
        tracing::info!("opening SQLite database");
        let path = config.path.as_str();

        let conn = if path == ":memory:" {
            Connection::open_in_memory().map_err(|e| {
                BatchError::EngineUnavailable(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !path.starts_with("file:") {
                let file_path = std::path::Path::new(path);
                if let Some(parent) = file_path.parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    return Err(BatchError::EngineUnavailable(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            Connection::open_with_flags(path, flags).map_err(|e| {
                BatchError::EngineUnavailable(format!(
                    "Failed to open SQLite database at '{}': {}",
                    path, e
                ))
            })?
        };

        let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
        conn.pragma_update(None, "foreign_keys", foreign_keys)
            .map_err(|e| BatchError::Configuration(format!("Failed to set foreign keys: {}", e)))?;

        if let Some(mode) = &config.journal_mode {
            conn.pragma_update(None, "journal_mode", mode)
                .map_err(|e| BatchError::Configuration(format!("Failed to set journal mode: {}", e)))?;
        }

        let engine = Self {
            conn: Some(conn),
            path: path.to_string(),
        };

        let overrides = [
            (LimitKind::SqlLength, config.limits.max_sql_length),
            (LimitKind::VariableNumber, config.limits.max_variable_number),
            (LimitKind::CompoundSelect, config.limits.max_compound_select),
        ];
        for (kind, value) in overrides {
            if let Some(value) = value {
                engine.set_limit(kind, value as usize)?;
            }
        }

        let ceilings = engine.ceilings()?;
        tracing::info!(
            max_sql_length = ceilings.max_sql_length,
            max_variable_number = ceilings.max_variable_number,
            max_compound_terms = ceilings.max_compound_terms,
            "SQLite database connection established"
        );
        Ok(engine)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Close the connection. Later operations fail with `EngineUnavailable`.
    pub fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        tracing::info!(path = %self.path, "closing SQLite connection");
        conn.close().map_err(|(_, e)| {
            BatchError::EngineUnavailable(format!("Failed to close connection: {}", e))
        })
    }

    /// Execute a single statement without parameters, returning the affected row count
    pub fn execute(&self, sql: &str) -> Result<usize> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing statement");
        let conn = self.connection()?;
        let affected = conn.execute(sql, []).map_err(|e| match e {
            rusqlite::Error::SqliteFailure(_, _) => BatchError::prepare(sql, e.to_string()),
            other => BatchError::Step(other.to_string()),
        })?;
        tracing::debug!(affected_rows = affected, "statement executed");
        Ok(affected)
    }

    pub fn limit(&self, kind: LimitKind) -> Result<usize> {
        let value = self.connection()?.limit(kind.as_rusqlite());
        usize::try_from(value)
            .map_err(|_| BatchError::Configuration(format!("invalid {:?} limit: {}", kind, value)))
    }

    /// Change a run-time limit, returning the previous value.
    ///
    /// SQLite silently truncates values above its compile-time maximum.
    pub fn set_limit(&self, kind: LimitKind, value: usize) -> Result<usize> {
        let new_value = i32::try_from(value)
            .map_err(|_| BatchError::Configuration(format!("{:?} limit too large: {}", kind, value)))?;
        let previous = self.connection()?.set_limit(kind.as_rusqlite(), new_value);
        tracing::debug!(?kind, previous, requested = new_value, "SQLite limit changed");
        usize::try_from(previous)
            .map_err(|_| BatchError::Configuration(format!("invalid {:?} limit: {}", kind, previous)))
    }

    fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| BatchError::EngineUnavailable(format!("connection to '{}' is closed", self.path)))
    }
}

impl Engine for SqliteEngine {
    type Statement<'e> = SqliteStatement<'e>;

    fn ceilings(&self) -> Result<ResourceCeilings> {
        Ok(ResourceCeilings::new(
            self.limit(LimitKind::SqlLength)?,
            self.limit(LimitKind::VariableNumber)?,
            self.limit(LimitKind::CompoundSelect)?,
        ))
    }

    fn prepare(&self, sql: &str) -> Result<SqliteStatement<'_>> {
        let statement = self
            .connection()?
            .prepare(sql)
            .map_err(|e| BatchError::prepare(sql, e.to_string()))?;
        Ok(SqliteStatement {
            statement,
            rows: None,
        })
    }
}

/// A prepared SQLite statement.
///
/// The first `step` runs the statement to completion and buffers its rows;
/// later steps hand them out in order.
pub struct SqliteStatement<'conn> {
    statement: rusqlite::Statement<'conn>,
    rows: Option<VecDeque<Vec<Value>>>,
}

impl SqliteStatement<'_> {
    fn run(&mut self) -> Result<VecDeque<Vec<Value>>> {
        let column_count = self.statement.column_count();
        if column_count == 0 {
            let affected = self
                .statement
                .raw_execute()
                .map_err(|e| BatchError::Step(e.to_string()))?;
            tracing::trace!(affected_rows = affected, "statement executed");
            return Ok(VecDeque::new());
        }

        let mut buffered = VecDeque::new();
        let mut query_rows = self.statement.raw_query();
        while let Some(row) = query_rows
            .next()
            .map_err(|e| BatchError::Step(e.to_string()))?
        {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                values.push(rusqlite_to_value(row, idx)?);
            }
            buffered.push_back(values);
        }
        Ok(buffered)
    }
}

impl Statement for SqliteStatement<'_> {
    fn bind(&mut self, position: usize, value: &Value) -> Result<()> {
        if self.rows.is_some() {
            return Err(BatchError::bind(position, "statement already stepped"));
        }
        self.statement
            .raw_bind_parameter(position, value_to_rusqlite(value))
            .map_err(|e| BatchError::bind(position, e.to_string()))
    }

    fn step(&mut self) -> Result<Step> {
        if self.rows.is_none() {
            let rows = self.run()?;
            self.rows = Some(rows);
        }
        Ok(match self.rows.as_mut().and_then(VecDeque::pop_front) {
            Some(values) => Step::Row(values),
            None => Step::Done,
        })
    }
}
