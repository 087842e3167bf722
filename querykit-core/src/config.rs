//! Instance-scoped configuration.
//!
//! Nothing here is global: each [`Database`](crate::Database) owns the
//! [`DatabaseConfig`] it was built with.
//!
//! ```json
//! {
//!   "path": "app.sqlite",
//!   "busy_timeout_ms": 2000,
//!   "journal_mode": "wal",
//!   "database": { "table_prefix": "app_", "cache_results": true }
//! }
//! ```

use std::path::PathBuf;

use querykit_db::OpenOptions;
use serde::Deserialize;

use crate::binder::BindingMode;
use crate::error::{QueryError, QueryResult};

/// Path of the private in-memory `SQLite` database.
pub const IN_MEMORY: &str = ":memory:";

/// Engine behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Prepended to every table token before quoting.
    pub table_prefix: String,
    /// Overrides the backend's preferred binding mode.
    pub binding_mode: Option<BindingMode>,
    /// Memoize the first result of every read for the connection's lifetime.
    pub cache_results: bool,
}

impl DatabaseConfig {
    /// A configuration with the given table prefix and defaults otherwise.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Sets the binding mode.
    #[must_use]
    pub fn binding_mode(mut self, mode: BindingMode) -> Self {
        self.binding_mode = Some(mode);
        self
    }

    /// Turns the result cache on or off.
    #[must_use]
    pub fn cache_results(mut self, enabled: bool) -> Self {
        self.cache_results = enabled;
        self
    }
}

/// Everything needed to open a `SQLite`-backed [`Database`](crate::Database).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    /// Database file, or [`IN_MEMORY`].
    pub path: PathBuf,
    /// Connection-level options, flattened into the same JSON object.
    #[serde(flatten)]
    pub options: OpenOptions,
    /// Engine behavior.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl ConnectionConfig {
    /// A file-backed configuration with default options.
    pub fn new(path: impl Into<PathBuf>, database: DatabaseConfig) -> Self {
        Self {
            path: path.into(),
            options: OpenOptions::default(),
            database,
        }
    }

    /// A private in-memory database.
    pub fn in_memory(database: DatabaseConfig) -> Self {
        Self::new(IN_MEMORY, database)
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Config`] if the JSON is malformed or a field has
    /// the wrong type.
    pub fn from_json(json: &str) -> QueryResult<Self> {
        serde_json::from_str(json).map_err(|err| QueryError::Config(err.to_string()))
    }

    /// Returns `true` for the in-memory path.
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == IN_MEMORY
    }
}
