//! sqlbatch core - buffered batch queries bounded by engine limits
//!
//! This crate turns many small writes and lookups into few compound
//! statements while keeping every statement within the text length, bound
//! parameter and compound term ceilings the engine reports. It defines:
//!
//! - `Engine` / `Statement` - traits a database engine implements
//! - `BufferedInsert` - accumulates rows into multi-row INSERT statements
//! - `KeyedSelect` - accumulates lookup keys into chunked OR-predicate selects
//! - `TypedQuery` - a single prepared statement with typed rows
//! - `ChunkSizer` - the ceiling estimator shared by both buffered queries
//! - Common types like `Value`, `Schema`, `Row`, `Key`

mod binder;
mod engine;
mod error;
mod insert;
mod keyed;
mod query;
pub mod sizer;
mod sql;
mod types;

#[cfg(test)]
mod testing;

pub use binder::bind_tuple;
pub use engine::*;
pub use error::*;
pub use insert::BufferedInsert;
pub use keyed::{CursorPosition, CursorState, KeyedQuery, KeyedSelect};
pub use query::TypedQuery;
pub use sizer::{ChunkSizer, Footprint};
pub use types::*;
