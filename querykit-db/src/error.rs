//! Database error types for the safe `SQLite` wrapper.

use std::fmt;

use thiserror::Error;

/// Generic `SQLite` error code, used when no native code is available.
pub const SQLITE_ERROR: i32 = 1;
/// `SQLite` code for "bind or column index out of range".
pub const SQLITE_RANGE: i32 = 25;
/// `SQLite` code for "misuse of the library interface".
pub const SQLITE_MISUSE: i32 = 21;

/// Error code returned by `SQLite` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbErrorCode(pub i32);

impl fmt::Display for DbErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned by database operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sqlite error {code}: {message}")]
pub struct DbError {
    /// `SQLite` (extended) result code.
    pub code: DbErrorCode,
    /// Human-readable error message.
    pub message: String,
}

impl DbError {
    /// Creates a new database error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: DbErrorCode(code),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::SqliteFailure(native, _) => native.extended_code,
            rusqlite::Error::InvalidParameterName(_)
            | rusqlite::Error::InvalidParameterCount(_, _)
            | rusqlite::Error::InvalidColumnIndex(_) => SQLITE_RANGE,
            _ => SQLITE_ERROR,
        };
        Self::new(code, err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
