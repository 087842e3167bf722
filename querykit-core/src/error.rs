//! Error types for the query engine.

use std::fmt;

use thiserror::Error;

/// Result type for engine operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// A native `(code, message)` pair reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Backend-specific error code.
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorRecord {
    /// Creates a new error record.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<querykit_db::DbError> for ErrorRecord {
    fn from(err: querykit_db::DbError) -> Self {
        Self::new(err.code.0, err.message)
    }
}

/// A requested column that a fetched row does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeError {
    /// Index of the offending row in a multi-row fetch.
    pub row: Option<usize>,
    /// The requested column index.
    pub column: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "column {} is not defined in row {row}", self.column),
            None => write!(f, "column {} is not defined", self.column),
        }
    }
}

/// Errors raised by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The connection could not be established. The instance is unusable.
    #[error("connection error: {0}")]
    Connection(ErrorRecord),

    /// No valid statement is live, or the backend refused a binding.
    #[error("binding error: {0}")]
    Binding(String),

    /// Execution or fetch failed in the backend.
    #[error("backend error: {0}")]
    Backend(ErrorRecord),

    /// A single-row fetch found no row.
    #[error("query returned no rows")]
    NoRows,

    /// A requested column is missing from a row.
    #[error("shape error: {0}")]
    Shape(ShapeError),

    /// Invalid or unreadable configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl QueryError {
    /// A stable numeric code for the error category.
    pub const fn code(&self) -> u16 {
        match self {
            Self::Connection(_) => 100,
            Self::Binding(_) => 200,
            Self::Backend(_) => 300,
            Self::NoRows => 400,
            Self::Shape(_) => 401,
            Self::Config(_) => 500,
        }
    }

    /// The native backend record behind this error, if there is one.
    pub const fn record(&self) -> Option<&ErrorRecord> {
        match self {
            Self::Connection(record) | Self::Backend(record) => Some(record),
            _ => None,
        }
    }
}

impl From<ErrorRecord> for QueryError {
    fn from(record: ErrorRecord) -> Self {
        Self::Backend(record)
    }
}
