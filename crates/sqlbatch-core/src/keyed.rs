//! Buffered keyed select cursor
//!
//! Lookup keys are collected into an ordered set and fetched in chunks with
//! compound OR predicates:
//!
//! ```text
//! <prefix>(`k1` = ? AND `k2` = ?) OR (`k1` = ? AND `k2` = ?) ...<postfix>
//! ```
//!
//! Rows are produced lazily. When the active chunk runs dry and keys are
//! still pending, the next chunk is pulled transparently.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::binder::bind_tuple;
use crate::sizer::{ChunkSizer, Footprint};
use crate::sql::{compound, quote_ident};
use crate::{BatchError, Engine, Key, Result, Row, Schema, Statement, Status, Step, Value};

const FIELD_SEPARATOR: &str = " AND ";
const PREDICATE_SEPARATOR: &str = " OR ";

static NEXT_CURSOR_ID: AtomicU64 = AtomicU64::new(1);

/// Statement shape of a keyed select
#[derive(Debug, Clone)]
pub struct KeyedQuery {
    /// Text placed before the first predicate, e.g. `SELECT ... WHERE `
    pub prefix: String,
    /// Text placed after the last predicate
    pub postfix: String,
    /// Key columns and their types, in predicate order
    pub key_schema: Schema,
    /// Layout of the result rows
    pub row_schema: Schema,
    /// Values for `?` placeholders inside the prefix, bound before the keys
    pub leading_params: Vec<Value>,
}

impl KeyedQuery {
    pub fn new(prefix: impl Into<String>, key_schema: Schema, row_schema: Schema) -> Self {
        Self {
            prefix: prefix.into(),
            postfix: String::new(),
            key_schema,
            row_schema,
            leading_params: Vec::new(),
        }
    }

    pub fn postfix(mut self, postfix: impl Into<String>) -> Self {
        self.postfix = postfix.into();
        self
    }

    pub fn leading_params(mut self, params: Vec<Value>) -> Self {
        self.leading_params = params;
        self
    }
}

/// Lifecycle of a [`KeyedSelect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Keys may be pending, no row has been produced from the current chunk
    Idle,
    /// The last advance produced a row
    Active,
    /// The current chunk is drained; more keys may remain
    ExhaustedChunk,
    /// No active row and no pending keys, or the cursor failed
    Done,
}

/// Snapshot of where a cursor stands.
///
/// Two positions are equal when they belong to the same cursor and are both
/// terminal, or when cursor, terminal flag, row position and last status all
/// match.
#[derive(Debug, Clone, Copy)]
pub struct CursorPosition {
    cursor: u64,
    terminal: bool,
    position: usize,
    status: Status,
}

impl CursorPosition {
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Rows produced from the current chunk
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

impl PartialEq for CursorPosition {
    fn eq(&self, other: &Self) -> bool {
        if self.cursor != other.cursor || self.terminal != other.terminal {
            return false;
        }
        self.terminal || (self.position == other.position && self.status == other.status)
    }
}

impl Eq for CursorPosition {}

/// Coalesces lookup keys into chunked OR-predicate selects
pub struct KeyedSelect<'e, E: Engine> {
    id: u64,
    engine: &'e E,
    query: KeyedQuery,
    fragment: String,
    sizer: ChunkSizer,
    footprint: Footprint,
    keys: BTreeSet<Key>,
    statement: Option<E::Statement<'e>>,
    state: CursorState,
    status: Status,
    position: usize,
    pull_count: usize,
}

impl<'e, E: Engine> KeyedSelect<'e, E> {
    /// Create a cursor for `query`, reading the engine ceilings once.
    ///
    /// Fails with a configuration error if the predicate for one key cannot
    /// fit the ceilings.
    pub fn new(engine: &'e E, query: KeyedQuery) -> Result<Self> {
        let sizer = ChunkSizer::new(engine.ceilings()?);

        let fields = query
            .key_schema
            .names()
            .map(|name| format!("{} = ?", quote_ident(name)))
            .collect::<Vec<_>>()
            .join(FIELD_SEPARATOR);
        let fragment = format!("({})", fields);
        let footprint = Footprint::new(
            &query.prefix,
            &fragment,
            PREDICATE_SEPARATOR,
            &query.postfix,
            query.key_schema.len(),
        )
        .with_param_offset(query.leading_params.len());
        sizer.check_single(&footprint)?;

        let id = NEXT_CURSOR_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            cursor = id,
            key_columns = query.key_schema.len(),
            leading_params = query.leading_params.len(),
            "keyed select created"
        );
        Ok(Self {
            id,
            engine,
            query,
            fragment,
            sizer,
            footprint,
            keys: BTreeSet::new(),
            statement: None,
            state: CursorState::Idle,
            status: Status::Ok,
            position: 0,
            pull_count: 0,
        })
    }

    /// Queue a key for lookup. Duplicate keys collapse into one.
    ///
    /// Valid in any state; a finished cursor becomes idle again. Returns
    /// whether the key was not already pending.
    pub fn add_key(&mut self, key: Key) -> Result<bool> {
        self.query.key_schema.validate(key.values())?;
        let inserted = self.keys.insert(key);
        if self.state == CursorState::Done {
            self.state = CursorState::Idle;
        }
        Ok(inserted)
    }

    /// Build a key from raw values and queue it
    pub fn add_key_values(&mut self, values: Vec<Value>) -> Result<bool> {
        let key = self.query.key_schema.key(values)?;
        self.add_key(key)
    }

    /// Replace the active statement with the next chunk of pending keys.
    ///
    /// Returns `false` and marks the cursor done when no keys are pending.
    /// Keys leave the pending set only once their statement is prepared and
    /// fully bound; on failure they are put back.
    pub fn pull(&mut self) -> Result<bool> {
        self.statement = None;
        self.position = 0;

        if self.keys.is_empty() {
            self.state = CursorState::Done;
            self.status = Status::Done;
            return Ok(false);
        }

        let count = match self.sizer.max_chunk(&self.footprint, self.keys.len()) {
            Ok(count) => count,
            Err(e) => return Err(self.fail(e)),
        };
        let chunk: Vec<Key> = (0..count).filter_map(|_| self.keys.pop_first()).collect();

        match self.prepare_chunk(&chunk) {
            Ok(stmt) => {
                self.statement = Some(stmt);
                self.state = CursorState::Idle;
                self.status = Status::Ok;
                self.pull_count += 1;
                tracing::debug!(
                    cursor = self.id,
                    keys = chunk.len(),
                    remaining = self.keys.len(),
                    "pulled keyed chunk"
                );
                Ok(true)
            }
            Err(e) => {
                self.keys.extend(chunk);
                Err(self.fail(e))
            }
        }
    }

    fn prepare_chunk(&self, chunk: &[Key]) -> Result<E::Statement<'e>> {
        let sql = compound(
            &self.query.prefix,
            &self.fragment,
            PREDICATE_SEPARATOR,
            chunk.len(),
            &self.query.postfix,
        );
        tracing::trace!(
            cursor = self.id,
            sql_len = sql.len(),
            sql_preview = %sql.chars().take(100).collect::<String>(),
            "preparing keyed chunk"
        );

        let engine: &'e E = self.engine;
        let mut stmt = engine.prepare(&sql)?;
        let mut position = bind_tuple(&mut stmt, 1, &self.query.leading_params)?;
        for key in chunk {
            position = bind_tuple(&mut stmt, position, key.values())?;
        }
        Ok(stmt)
    }

    /// Move to the next row, pulling chunks as needed.
    ///
    /// Returns `Ok(None)` once no rows and no keys remain. Any error leaves
    /// the cursor done.
    pub fn advance(&mut self) -> Result<Option<Row>> {
        if self.state == CursorState::Done {
            return Ok(None);
        }

        loop {
            let step = match self.statement.as_mut() {
                Some(stmt) => stmt.step(),
                None => {
                    if !self.pull()? {
                        return Ok(None);
                    }
                    continue;
                }
            };

            match step {
                Ok(Step::Row(raw)) => {
                    let row = match self.query.row_schema.decode_row(raw) {
                        Ok(row) => row,
                        Err(e) => return Err(self.fail(e)),
                    };
                    self.state = CursorState::Active;
                    self.status = Status::Row;
                    self.position += 1;
                    return Ok(Some(row));
                }
                Ok(Step::Done) => {
                    self.statement = None;
                    self.state = CursorState::ExhaustedChunk;
                    self.status = Status::Done;
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    /// Next row, or `None` once finished or failed; see [`Self::status`]
    pub fn produce_next(&mut self) -> Option<Row> {
        self.advance().unwrap_or_default()
    }

    /// Drain every remaining row, surfacing the first error
    pub fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.advance()? {
            rows.push(row);
        }
        Ok(rows)
    }

    fn fail(&mut self, e: BatchError) -> BatchError {
        tracing::warn!(cursor = self.id, error = %e, "keyed select failed");
        self.statement = None;
        self.state = CursorState::Done;
        self.status = Status::from(&e);
        e
    }

    pub fn is_terminal(&self) -> bool {
        self.state == CursorState::Done
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Outcome of the most recent pull or advance
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn position(&self) -> CursorPosition {
        CursorPosition {
            cursor: self.id,
            terminal: self.is_terminal(),
            position: self.position,
            status: self.status,
        }
    }

    pub fn pending_keys(&self) -> usize {
        self.keys.len()
    }

    /// Number of chunk statements prepared so far
    pub fn pull_count(&self) -> usize {
        self.pull_count
    }
}

impl<E: Engine> Iterator for KeyedSelect<'_, E> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.produce_next()
    }
}
