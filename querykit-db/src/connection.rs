//! Safe wrapper around a `SQLite` database connection.

use std::path::Path;
use std::sync::Arc;

use rusqlite::OpenFlags;

use super::error::DbResult;
use super::statement::{ResultSet, Statement};
use super::value::Value;

/// Transaction locking behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionBehavior {
    /// `BEGIN DEFERRED` (the default).
    #[default]
    Deferred,
    /// `BEGIN IMMEDIATE` – acquires a RESERVED lock immediately.
    Immediate,
}

/// A `SQLite` database connection.
///
/// Closed when dropped. Not `Sync` -- one caller drives a connection at a
/// time.
pub struct Connection {
    conn: rusqlite::Connection,
}

impl Connection {
    /// Opens (or creates) a database at `path`.
    pub fn open(path: &Path, read_only: bool) -> DbResult<Self> {
        let flags = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX
        };
        let conn = rusqlite::Connection::open_with_flags(path, flags)?;
        Ok(Self { conn })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Executes one or more SQL statements separated by semicolons.
    ///
    /// No result rows are returned. Suitable for DDL, PRAGMAs, and
    /// multi-statement scripts.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Prepares a single SQL statement.
    ///
    /// The SQL is compiled once here so syntax and schema errors surface
    /// before any value is bound.
    pub fn prepare(&self, sql: &str) -> DbResult<Statement> {
        let raw = self.conn.prepare(sql)?;
        let parameter_names = (1..=raw.parameter_count())
            .map(|idx| raw.parameter_name(idx).map(str::to_owned))
            .collect();
        Ok(Statement::new(
            sql.to_owned(),
            parameter_names,
            raw.column_count(),
        ))
    }

    /// Executes `stmt` with its bound values and buffers every result row.
    pub fn run(&self, stmt: &Statement) -> DbResult<ResultSet> {
        let total_before = self.total_changes()?;
        let mut raw = self.conn.prepare(stmt.sql())?;
        for (idx, value) in stmt.bindings() {
            raw.raw_bind_parameter(*idx, value)?;
        }
        let columns: Arc<[String]> = raw
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        let width = columns.len();

        let mut rows = Vec::new();
        {
            let mut cursor = raw.raw_query();
            while let Some(row) = cursor.next()? {
                let mut values = Vec::with_capacity(width);
                for idx in 0..width {
                    values.push(Value::from_ref(row.get_ref(idx)?));
                }
                rows.push(values);
            }
        }

        // sqlite3_changes() keeps the last DML count across DDL and PRAGMAs.
        let changes = if width == 0 && self.total_changes()? != total_before {
            self.changes()
        } else {
            0
        };
        Ok(ResultSet {
            columns,
            rows,
            changes,
        })
    }

    /// Prepares and executes a single SQL statement with positional
    /// parameters.
    ///
    /// Returns the number of rows changed.
    pub fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind_values(params)?;
        Ok(self.run(&stmt)?.changes())
    }

    /// Begins a transaction.
    pub fn begin(&self, behavior: TransactionBehavior) -> DbResult<()> {
        let sql = match behavior {
            TransactionBehavior::Deferred => "BEGIN DEFERRED",
            TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
        };
        self.execute_batch(sql)
    }

    /// Commits the open transaction.
    pub fn commit(&self) -> DbResult<()> {
        self.execute_batch("COMMIT")
    }

    /// Rolls back the open transaction.
    pub fn rollback(&self) -> DbResult<()> {
        self.execute_batch("ROLLBACK")
    }

    /// Returns `false` while a transaction is open.
    pub fn is_autocommit(&self) -> bool {
        self.conn.is_autocommit()
    }

    /// Returns the rowid of the most recent successful INSERT.
    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// Returns the number of rows changed by the most recent statement.
    pub fn changes(&self) -> usize {
        usize::try_from(self.conn.changes()).unwrap_or(usize::MAX)
    }

    fn total_changes(&self) -> DbResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT total_changes()", [], |row| row.get(0))?)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("autocommit", &self.conn.is_autocommit())
            .finish_non_exhaustive()
    }
}
