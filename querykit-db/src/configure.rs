//! Connection configuration.
//!
//! # Open flow
//!
//! 1. **Open** -- the file is opened (or created) read-write, or read-only
//!    when requested.
//!
//! 2. **Configure** -- foreign keys, the busy timeout, and optionally the
//!    journal mode are applied with PRAGMAs. Read-only connections skip the
//!    journal mode since changing it needs write access.
//!
//! 3. **Verify** -- a lightweight read of `sqlite_master` confirms the file
//!    is a database. A corrupt or foreign file fails here with a clear
//!    error instead of on the first query.

use std::path::Path;

use serde::Deserialize;

use super::connection::Connection;
use super::error::{DbError, DbResult};

/// `SQLite` journal modes selectable at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Rollback journal deleted at the end of each transaction.
    Delete,
    /// Write-ahead log.
    Wal,
    /// Journal kept in memory.
    Memory,
}

impl JournalMode {
    const fn as_pragma(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Wal => "WAL",
            Self::Memory => "MEMORY",
        }
    }
}

/// Options applied when opening a connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Open without write access.
    pub read_only: bool,
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
    /// How long a locked database is retried before failing, in milliseconds.
    pub busy_timeout_ms: u32,
    /// Journal mode to switch to, if any.
    pub journal_mode: Option<JournalMode>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            foreign_keys: true,
            busy_timeout_ms: 5_000,
            journal_mode: None,
        }
    }
}

/// Opens a database and applies `options`.
///
/// See the [module-level documentation](self) for the open flow.
pub fn open_configured(path: &Path, options: &OpenOptions) -> DbResult<Connection> {
    let conn = Connection::open(path, options.read_only)?;
    configure_connection(&conn, options)?;
    run_pragma(&conn, "SELECT count(*) FROM sqlite_master;")
        .map_err(|e| {
            DbError::new(
                e.code.0,
                format!("database verification failed (is this a database?): {}", e.message),
            )
        })?;
    Ok(conn)
}

fn configure_connection(conn: &Connection, options: &OpenOptions) -> DbResult<()> {
    let foreign_keys = if options.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    run_pragma(conn, &format!("PRAGMA busy_timeout = {};", options.busy_timeout_ms))?;
    if let Some(mode) = options.journal_mode {
        if !options.read_only {
            run_pragma(conn, &format!("PRAGMA journal_mode = {};", mode.as_pragma()))?;
        }
    }
    Ok(())
}

// PRAGMAs that echo their new value return a row, so they go through
// `run` rather than `execute_batch`.
fn run_pragma(conn: &Connection, sql: &str) -> DbResult<()> {
    let stmt = conn.prepare(sql)?;
    conn.run(&stmt)?;
    Ok(())
}

/// Runs `PRAGMA integrity_check` and returns whether the database is healthy.
pub fn integrity_check(conn: &Connection) -> DbResult<bool> {
    let result = conn.run(&conn.prepare("PRAGMA integrity_check;")?)?;
    Ok(matches!(
        result.rows().first().and_then(|row| row.first()),
        Some(super::Value::Text(text)) if text.trim() == "ok"
    ))
}
