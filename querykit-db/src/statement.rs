//! Owned prepared statements and buffered result sets.
//!
//! A [`Statement`] does not borrow its [`Connection`](super::Connection):
//! it keeps the validated SQL text, the parameter names `SQLite` reported at
//! prepare time, and the values bound so far. The native handle is
//! re-acquired on every [`Connection::run`](super::Connection::run), which
//! lets callers park a statement next to the connection that owns it.

use std::sync::Arc;

use super::error::{DbError, DbResult, SQLITE_RANGE};
use super::value::Value;

/// A prepared `SQLite` statement.
///
/// Created via [`Connection::prepare`](super::Connection::prepare), which
/// validates the SQL against the database schema.
#[derive(Debug, Clone)]
pub struct Statement {
    sql: String,
    /// Name of parameter `i + 1`, `None` for anonymous `?` parameters.
    parameter_names: Vec<Option<String>>,
    column_count: usize,
    /// `(1-based index, value)` pairs, at most one per index.
    bindings: Vec<(usize, Value)>,
}

impl Statement {
    pub(super) const fn new(
        sql: String,
        parameter_names: Vec<Option<String>>,
        column_count: usize,
    ) -> Self {
        Self {
            sql,
            parameter_names,
            column_count,
            bindings: Vec::new(),
        }
    }

    /// The SQL text this statement was prepared from.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of parameters the statement expects.
    pub fn parameter_count(&self) -> usize {
        self.parameter_names.len()
    }

    /// Number of columns in the result set (0 for DML/DDL).
    pub const fn column_count(&self) -> usize {
        self.column_count
    }

    /// Returns the 1-based index of the named parameter, including its sigil
    /// (`:id`, `@id`, `$id`, `?3`).
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameter_names
            .iter()
            .position(|candidate| candidate.as_deref() == Some(name))
            .map(|pos| pos + 1)
    }

    /// Binds `value` to the named parameter.
    pub fn bind(&mut self, name: &str, value: Value) -> DbResult<()> {
        let idx = self.parameter_index(name).ok_or_else(|| {
            DbError::new(SQLITE_RANGE, format!("unknown parameter name: {name}"))
        })?;
        self.bind_index(idx, value)
    }

    /// Binds `value` to the 1-based parameter `idx`, replacing any earlier
    /// value bound there.
    pub fn bind_index(&mut self, idx: usize, value: Value) -> DbResult<()> {
        if idx == 0 || idx > self.parameter_count() {
            return Err(DbError::new(
                SQLITE_RANGE,
                format!("parameter index {idx} out of range"),
            ));
        }
        match self.bindings.iter_mut().find(|(bound, _)| *bound == idx) {
            Some(slot) => slot.1 = value,
            None => self.bindings.push((idx, value)),
        }
        Ok(())
    }

    /// Binds a slice of [`Value`]s to the statement parameters (1-indexed).
    pub fn bind_values(&mut self, values: &[Value]) -> DbResult<()> {
        for (i, val) in values.iter().enumerate() {
            self.bind_index(i + 1, val.clone())?;
        }
        Ok(())
    }

    /// Values bound so far, as `(1-based index, value)` pairs.
    pub fn bindings(&self) -> &[(usize, Value)] {
        &self.bindings
    }
}

/// All rows produced by one execution of a [`Statement`].
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub(super) columns: Arc<[String]>,
    pub(super) rows: Vec<Vec<Value>>,
    pub(super) changes: usize,
}

impl ResultSet {
    /// Column names, shared by every row.
    pub fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    /// Buffered rows in result order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Consumes the set, returning the column names and the rows.
    pub fn into_parts(self) -> (Arc<[String]>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }

    /// Rows changed by the execution (0 for statements returning columns).
    pub const fn changes(&self) -> usize {
        self.changes
    }

    /// Number of buffered rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the execution produced no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
