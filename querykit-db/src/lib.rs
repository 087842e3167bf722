//! Minimal safe `SQLite` wrapper used as the QueryKit native driver.
//!
//! This crate provides a small, owned API over `rusqlite`:
//!
//! * [`Connection`] opens a database, prepares and runs statements, and
//!   exposes the transaction primitives.
//! * [`Statement`] is an owned prepared statement. It does not borrow the
//!   connection, so a caller can hold exactly one "live" statement next to
//!   the connection that produced it.
//! * [`ResultSet`] buffers every row of one execution.
//!
//! Consumer code (the QueryKit engine) uses only the types defined here and
//! never touches `rusqlite` directly.

mod connection;
pub mod configure;
pub mod error;
pub mod escape;
mod statement;
pub mod value;

pub use configure::{open_configured, JournalMode, OpenOptions};
pub use connection::{Connection, TransactionBehavior};
pub use error::{DbError, DbResult};
pub use statement::{ResultSet, Statement};
pub use value::Value;
