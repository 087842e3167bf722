#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Statement templating, parameter binding and result caching over a single
//! database connection.
//!
//! A template names tables with tokens (`{users}`) and values with
//! placeholders (`:id`). [`Database`] rewrites the tokens with the configured
//! table prefix, binds a [`ParameterSet`] either through the backend's typed
//! parameters or as escaped inline literals, runs the statement and returns
//! rows, a single row, a scalar, or one column. With caching on, the first
//! result of every rendered read is kept for the life of the connection.

mod backend;
pub use backend::Backend;

pub mod binder;
pub use binder::{Binding, BindingMode, BoundStatement};

mod cache;
pub use cache::{CacheKey, CachedResult, FetchShape, StatementCache};

mod config;
pub use config::{ConnectionConfig, DatabaseConfig, IN_MEMORY};

mod error;
pub use error::{ErrorRecord, QueryError, QueryResult, ShapeError};

mod executor;
pub use executor::{Database, ExecutionStats, Phase};

pub mod logger;

mod row;
pub use row::{Cell, ColumnFetch, Row};

mod sqlite;
pub use sqlite::SqliteBackend;

pub mod template;

mod value;
pub use value::{Param, ParamType, ParameterSet, Scalar, Value};

pub use querykit_db::{JournalMode, OpenOptions};

// private modules
mod scan;
