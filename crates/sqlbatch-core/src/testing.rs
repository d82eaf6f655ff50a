//! Recording in-memory engine for unit tests

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use crate::{BatchError, Engine, ResourceCeilings, Result, Statement, Step, Value};

/// One statement that was stepped at least once
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Executed {
    pub sql: String,
    pub params: Vec<Value>,
}

type RowSource = Box<dyn Fn(&str, &[Value]) -> Vec<Vec<Value>>>;

pub(crate) struct MockEngine {
    ceilings: ResourceCeilings,
    rows: RowSource,
    pub executed: RefCell<Vec<Executed>>,
    pub prepared: RefCell<Vec<String>>,
    pub fail_prepare: Cell<bool>,
    pub fail_bind_position: Cell<Option<usize>>,
    pub fail_step: Cell<bool>,
    pub closed: Cell<bool>,
}

impl MockEngine {
    pub fn new(ceilings: ResourceCeilings) -> Self {
        Self::with_rows(ceilings, |_, _| Vec::new())
    }

    /// Engine whose SELECTs return `rows(sql, params)`
    pub fn with_rows(
        ceilings: ResourceCeilings,
        rows: impl Fn(&str, &[Value]) -> Vec<Vec<Value>> + 'static,
    ) -> Self {
        Self {
            ceilings,
            rows: Box::new(rows),
            executed: RefCell::new(Vec::new()),
            prepared: RefCell::new(Vec::new()),
            fail_prepare: Cell::new(false),
            fail_bind_position: Cell::new(None),
            fail_step: Cell::new(false),
            closed: Cell::new(false),
        }
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.executed.borrow().clone()
    }
}

impl Engine for MockEngine {
    type Statement<'e> = MockStatement<'e>;

    fn ceilings(&self) -> Result<ResourceCeilings> {
        if self.closed.get() {
            return Err(BatchError::EngineUnavailable("mock engine closed".into()));
        }
        Ok(self.ceilings)
    }

    fn prepare(&self, sql: &str) -> Result<MockStatement<'_>> {
        if self.closed.get() {
            return Err(BatchError::EngineUnavailable("mock engine closed".into()));
        }
        if self.fail_prepare.get() {
            return Err(BatchError::prepare(sql, "injected prepare failure"));
        }
        self.prepared.borrow_mut().push(sql.to_string());
        Ok(MockStatement {
            engine: self,
            sql: sql.to_string(),
            params: BTreeMap::new(),
            pending: None,
        })
    }
}

pub(crate) struct MockStatement<'e> {
    engine: &'e MockEngine,
    sql: String,
    params: BTreeMap<usize, Value>,
    pending: Option<VecDeque<Vec<Value>>>,
}

impl Statement for MockStatement<'_> {
    fn bind(&mut self, position: usize, value: &Value) -> Result<()> {
        if self.engine.fail_bind_position.get() == Some(position) {
            return Err(BatchError::bind(position, "injected bind failure"));
        }
        self.params.insert(position, value.clone());
        Ok(())
    }

    fn step(&mut self) -> Result<Step> {
        if self.engine.fail_step.get() {
            return Err(BatchError::Step("injected step failure".into()));
        }
        if self.pending.is_none() {
            let params: Vec<Value> = self.params.values().cloned().collect();
            let rows = (self.engine.rows)(&self.sql, &params);
            self.engine.executed.borrow_mut().push(Executed {
                sql: self.sql.clone(),
                params,
            });
            self.pending = Some(rows.into());
        }
        Ok(match self.pending.as_mut().and_then(|rows| rows.pop_front()) {
            Some(row) => Step::Row(row),
            None => Step::Done,
        })
    }
}
