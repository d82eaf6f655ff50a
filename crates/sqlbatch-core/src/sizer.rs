//! Chunk sizing against engine resource ceilings
//!
//! Both buffered queries build one compound statement out of a fixed prefix,
//! a repeated per-item fragment joined by a separator, and a fixed postfix.
//! The sizer finds how many items of such a statement fit the engine's text
//! length, bound parameter and compound term limits.

use crate::{BatchError, ResourceCeilings, Result};

/// Per-statement and per-item size of a compound statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    pub prefix_len: usize,
    pub fragment_len: usize,
    pub separator_len: usize,
    pub postfix_len: usize,
    /// Bound parameters contributed by each item
    pub params_per_item: usize,
    /// Bound parameters in the fixed part of the statement, before the items
    pub param_offset: usize,
}

impl Footprint {
    pub fn new(
        prefix: &str,
        fragment: &str,
        separator: &str,
        postfix: &str,
        params_per_item: usize,
    ) -> Self {
        Self {
            prefix_len: prefix.len(),
            fragment_len: fragment.len(),
            separator_len: separator.len(),
            postfix_len: postfix.len(),
            params_per_item,
            param_offset: 0,
        }
    }

    pub fn with_param_offset(mut self, param_offset: usize) -> Self {
        self.param_offset = param_offset;
        self
    }

    /// Upper bound on the text length of a statement holding `count` items.
    ///
    /// A separator is charged for every item, including the last one.
    pub fn estimated_sql_len(&self, count: usize) -> usize {
        self.prefix_len
            .saturating_add(count.saturating_mul(self.fragment_len + self.separator_len))
            .saturating_add(self.postfix_len)
    }

    pub fn estimated_params(&self, count: usize) -> usize {
        self.param_offset
            .saturating_add(count.saturating_mul(self.params_per_item))
    }
}

/// Estimator shared by the insert accumulator and the keyed cursor
#[derive(Debug, Clone, Copy)]
pub struct ChunkSizer {
    ceilings: ResourceCeilings,
}

impl ChunkSizer {
    pub fn new(ceilings: ResourceCeilings) -> Self {
        Self { ceilings }
    }

    pub fn ceilings(&self) -> ResourceCeilings {
        self.ceilings
    }

    /// Whether a statement holding `count` items stays within every ceiling
    pub fn fits(&self, footprint: &Footprint, count: usize) -> bool {
        self.violation(footprint, count).is_none()
    }

    /// Largest item count, at most `available`, that fits every ceiling.
    ///
    /// Fails with a configuration error when not even one item fits.
    pub fn max_chunk(&self, footprint: &Footprint, available: usize) -> Result<usize> {
        if available == 0 {
            return Ok(0);
        }

        let mut count = 0;
        while count < available && self.fits(footprint, count + 1) {
            count += 1;
        }

        if count == 0 {
            let reason = self
                .violation(footprint, 1)
                .unwrap_or_else(|| "unknown ceiling".to_string());
            return Err(BatchError::Configuration(format!(
                "a single item exceeds the engine limits: {}",
                reason
            )));
        }

        tracing::trace!(
            count,
            available,
            sql_len = footprint.estimated_sql_len(count),
            params = footprint.estimated_params(count),
            "chunk sized"
        );
        Ok(count)
    }

    /// Check a single item's footprint up front
    pub fn check_single(&self, footprint: &Footprint) -> Result<()> {
        self.max_chunk(footprint, 1).map(|_| ())
    }

    fn violation(&self, footprint: &Footprint, count: usize) -> Option<String> {
        let sql_len = footprint.estimated_sql_len(count);
        if sql_len > self.ceilings.max_sql_length {
            return Some(format!(
                "statement length {} > max {}",
                sql_len, self.ceilings.max_sql_length
            ));
        }
        let params = footprint.estimated_params(count);
        if params > self.ceilings.max_variable_number {
            return Some(format!(
                "bound parameters {} > max {}",
                params, self.ceilings.max_variable_number
            ));
        }
        if count > self.ceilings.max_compound_terms {
            return Some(format!(
                "compound terms {} > max {}",
                count, self.ceilings.max_compound_terms
            ));
        }
        None
    }
}
