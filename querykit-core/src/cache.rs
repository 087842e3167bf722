//! Per-connection result cache.
//!
//! Results are keyed by the rendered statement and the fetch shape that
//! produced them. Inline statements are keyed by their final text; prepared
//! statements by their SQL plus every typed binding. The first stored result for a key wins and is
//! never invalidated: a cached read stays the same for the life of the
//! [`Database`](crate::Database) even if the underlying rows change.

use std::collections::HashMap;

use crate::executor::ExecutionStats;
use crate::row::{Cell, ColumnFetch, Row};

/// Which fetch operation produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchShape {
    /// Every row.
    All,
    /// The first row.
    Row,
    /// One column of the first row.
    Scalar(usize),
    /// One column of every row.
    Column(usize),
}

/// Cache key: rendered statement plus fetch shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The inline SQL, or the prepared SQL followed by its typed bindings.
    pub statement: String,
    /// Fetch operation.
    pub shape: FetchShape,
}

impl CacheKey {
    /// Creates a key.
    pub fn new(statement: impl Into<String>, shape: FetchShape) -> Self {
        Self {
            statement: statement.into(),
            shape,
        }
    }
}

/// A cached fetch result.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedResult {
    /// Result of a multi-row fetch.
    Rows(Vec<Row>),
    /// Result of a single-row fetch. `None` when the query matched nothing.
    Row(Option<Row>),
    /// Result of a scalar fetch.
    Scalar(Cell),
    /// Result of a column fetch.
    Column(ColumnFetch),
}

impl CachedResult {
    /// Stats reported when this result is served.
    pub fn stats(&self) -> ExecutionStats {
        match self {
            Self::Rows(rows) => ExecutionStats::of_rows(rows),
            Self::Row(row) => ExecutionStats::of_row(row.as_ref()),
            Self::Scalar(_) => ExecutionStats::SCALAR,
            Self::Column(fetch) => ExecutionStats::of_column(fetch),
        }
    }
}

/// Map from [`CacheKey`] to the first result stored under it.
#[derive(Debug, Default)]
pub struct StatementCache {
    entries: HashMap<CacheKey, CachedResult>,
}

impl StatementCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The result stored under `key`, if any.
    pub fn lookup(&self, key: &CacheKey) -> Option<&CachedResult> {
        self.entries.get(key)
    }

    /// Stores `value` under `key` unless the key is already present.
    ///
    /// Returns `true` if the value was stored.
    pub fn store(&mut self, key: CacheKey, value: CachedResult) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, value);
        true
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
