//! SQLite engine for sqlbatch
//!
//! Implements the `sqlbatch_core::Engine` trait on top of rusqlite. The
//! engine reports SQLite's run-time limits as resource ceilings, so buffered
//! inserts and keyed selects size their chunks to what the connection
//! actually accepts.

mod config;
mod engine;
mod value;

pub use config::{LimitOverrides, SqliteConfig};
pub use engine::{LimitKind, SqliteEngine, SqliteStatement};
