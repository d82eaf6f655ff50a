//! Buffered insert accumulator
//!
//! Rows are appended to an in-memory buffer and written as compound
//! `INSERT INTO ... SELECT ?,? UNION ALL SELECT ?,? ...` statements. A flush
//! happens implicitly whenever the next row would push the statement past one
//! of the engine ceilings, explicitly through [`BufferedInsert::flush`], and
//! as a best effort when the accumulator is dropped.

use crate::binder::bind_tuple;
use crate::sizer::{ChunkSizer, Footprint};
use crate::sql::{compound, quote_ident};
use crate::{Engine, Result, Row, Schema, Statement, Status, Step};

const ROW_SEPARATOR: &str = " UNION ALL ";

/// Coalesces appended rows into multi-row INSERT statements
pub struct BufferedInsert<'e, E: Engine> {
    engine: &'e E,
    table: String,
    schema: Schema,
    sizer: ChunkSizer,
    footprint: Footprint,
    prefix: String,
    fragment: String,
    buffer: Vec<Row>,
    status: Status,
    flush_count: usize,
    rows_written: usize,
}

impl<'e, E: Engine> BufferedInsert<'e, E> {
    /// Create an accumulator writing into `table` with the columns of `schema`.
    ///
    /// The engine ceilings are read once here. Fails with a configuration
    /// error if a single row cannot fit them.
    pub fn new(engine: &'e E, table: impl Into<String>, schema: Schema) -> Result<Self> {
        let table = table.into();
        let sizer = ChunkSizer::new(engine.ceilings()?);

        let columns = schema
            .names()
            .map(quote_ident)
            .collect::<Vec<_>>()
            .join(", ");
        let prefix = format!("INSERT INTO {} ({}) ", quote_ident(&table), columns);
        let fragment = format!("SELECT {}", vec!["?"; schema.len()].join(","));
        let footprint = Footprint::new(&prefix, &fragment, ROW_SEPARATOR, "", schema.len());
        sizer.check_single(&footprint)?;

        tracing::debug!(
            table = %table,
            columns = schema.len(),
            ceilings = ?sizer.ceilings(),
            "buffered insert created"
        );
        Ok(Self {
            engine,
            table,
            schema,
            sizer,
            footprint,
            prefix,
            fragment,
            buffer: Vec::new(),
            status: Status::Ok,
            flush_count: 0,
            rows_written: 0,
        })
    }

    /// Buffer `row`, flushing first if it would not fit the current chunk.
    ///
    /// A row that fails schema validation is rejected. If the implicit flush
    /// fails the row is still buffered and the flush error is returned.
    pub fn append(&mut self, row: Row) -> Result<()> {
        if let Err(e) = self.schema.validate(row.values()) {
            self.status = Status::from(&e);
            return Err(e);
        }

        let mut result = Ok(());
        if !self.buffer.is_empty() && !self.sizer.fits(&self.footprint, self.buffer.len() + 1) {
            tracing::trace!(buffered = self.buffer.len(), "ceiling reached, flushing");
            result = self.flush();
        }
        self.buffer.push(row);
        result
    }

    /// Write every buffered row.
    ///
    /// Does nothing when the buffer is empty. Each statement covers the
    /// largest prefix of the buffer that fits the ceilings; on failure the
    /// rows of the failing statement and everything after stay buffered.
    pub fn flush(&mut self) -> Result<()> {
        while !self.buffer.is_empty() {
            let written = self
                .sizer
                .max_chunk(&self.footprint, self.buffer.len())
                .and_then(|count| self.write_chunk(count).map(|_| count));

            match written {
                Ok(count) => {
                    self.buffer.drain(..count);
                    self.flush_count += 1;
                    self.rows_written += count;
                    self.status = Status::Done;
                }
                Err(e) => {
                    tracing::debug!(table = %self.table, error = %e, "buffered insert flush failed");
                    self.status = Status::from(&e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn write_chunk(&self, count: usize) -> Result<()> {
        let sql = compound(&self.prefix, &self.fragment, ROW_SEPARATOR, count, "");
        tracing::debug!(
            table = %self.table,
            rows = count,
            sql_len = sql.len(),
            sql_preview = %sql.chars().take(100).collect::<String>(),
            "flushing buffered insert"
        );

        let mut stmt = self.engine.prepare(&sql)?;
        let mut position = 1;
        for row in &self.buffer[..count] {
            position = bind_tuple(&mut stmt, position, row.values())?;
        }
        while let Step::Row(_) = stmt.step()? {}
        Ok(())
    }

    /// Remove and return every buffered row without writing it
    pub fn take_pending(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.buffer)
    }

    pub fn pending(&self) -> &[Row] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Outcome of the most recent append or flush
    pub fn status(&self) -> Status {
        self.status
    }

    /// Number of INSERT statements executed successfully
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl<E: Engine> Drop for BufferedInsert<'_, E> {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::warn!(
                table = %self.table,
                unwritten = self.buffer.len(),
                error = %e,
                "final flush of buffered insert failed"
            );
        }
    }
}
