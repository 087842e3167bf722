//! [`Backend`] over the `querykit-db` `SQLite` wrapper.

use std::collections::VecDeque;
use std::fmt;

use querykit_db::error::SQLITE_MISUSE;
use querykit_db::{escape, open_configured, Connection, Statement, TransactionBehavior};

use crate::backend::Backend;
use crate::binder::BindingMode;
use crate::config::ConnectionConfig;
use crate::error::{ErrorRecord, QueryError, QueryResult};
use crate::row::{Cell, Row};
use crate::value::{ParamType, Scalar};

/// A `SQLite` connection with one statement slot.
///
/// Statements are prepared eagerly, so syntax and schema errors surface at
/// [`prepare`](Backend::prepare). Executing buffers every result row; the
/// fetch methods drain that buffer.
pub struct SqliteBackend {
    conn: Connection,
    statement: Option<Statement>,
    pending: VecDeque<Row>,
    affected: usize,
}

impl SqliteBackend {
    /// Opens the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Connection`] if the file cannot be opened,
    /// configured, or is not a database.
    pub fn connect(config: &ConnectionConfig) -> QueryResult<Self> {
        let conn = open_configured(&config.path, &config.options)
            .map_err(|err| QueryError::Connection(err.into()))?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an already open connection.
    pub const fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            statement: None,
            pending: VecDeque::new(),
            affected: 0,
        }
    }

    /// The underlying connection.
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    fn statement_mut(&mut self) -> Result<&mut Statement, ErrorRecord> {
        self.statement
            .as_mut()
            .ok_or_else(|| ErrorRecord::new(SQLITE_MISUSE, "no statement prepared"))
    }
}

impl fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("statement", &self.statement.as_ref().map(Statement::sql))
            .field("pending", &self.pending.len())
            .field("affected", &self.affected)
            .finish_non_exhaustive()
    }
}

/// Converts an engine value to the `SQLite` value bound for `param_type`.
fn native_value(value: &Scalar, param_type: ParamType) -> querykit_db::Value {
    use querykit_db::Value as Native;

    match (param_type, value) {
        (_, Scalar::Null) | (ParamType::Null, _) => Native::Null,
        (ParamType::Integer, Scalar::Text(text)) => text
            .trim()
            .parse()
            .map_or_else(|_| Native::Text(text.clone()), Native::Integer),
        (ParamType::Boolean, Scalar::Integer(v)) => Native::Integer(i64::from(*v != 0)),
        (ParamType::Boolean, Scalar::Text(text)) => {
            Native::Integer(i64::from(!text.is_empty() && text != "0"))
        }
        (ParamType::String, Scalar::Integer(v)) => Native::Text(v.to_string()),
        (ParamType::String, Scalar::Boolean(v)) => Native::Text(if *v { "1" } else { "0" }.into()),
        (ParamType::LargeObject, Scalar::Text(text)) => Native::Blob(text.as_bytes().to_vec()),
        (_, Scalar::Integer(v)) => Native::Integer(*v),
        (_, Scalar::Boolean(v)) => Native::Integer(i64::from(*v)),
        (_, Scalar::Text(text)) => Native::Text(text.clone()),
    }
}

impl Backend for SqliteBackend {
    fn binding_mode(&self) -> BindingMode {
        BindingMode::Prepared
    }

    fn quote_identifier(&self, name: &str) -> String {
        escape::quote_identifier(name)
    }

    fn escape_string(&self, raw: &str) -> String {
        escape::escape_string(raw)
    }

    fn prepare(&mut self, sql: &str) -> Result<(), ErrorRecord> {
        self.statement = None;
        self.pending.clear();
        self.statement = Some(self.conn.prepare(sql)?);
        Ok(())
    }

    fn bind(
        &mut self,
        key: &str,
        value: &Scalar,
        param_type: ParamType,
    ) -> Result<(), ErrorRecord> {
        let native = native_value(value, param_type);
        self.statement_mut()?.bind(key, native)?;
        Ok(())
    }

    fn execute(&mut self) -> Result<(), ErrorRecord> {
        let statement = self
            .statement
            .as_ref()
            .ok_or_else(|| ErrorRecord::new(SQLITE_MISUSE, "no statement prepared"))?;
        let result = self.conn.run(statement)?;
        self.affected = result.changes();
        let (columns, rows) = result.into_parts();
        self.pending = rows
            .into_iter()
            .map(|values| Row::new(columns.clone(), values.into_iter().map(Cell::from).collect()))
            .collect();
        Ok(())
    }

    fn fetch_row(&mut self) -> Result<Option<Row>, ErrorRecord> {
        Ok(self.pending.pop_front())
    }

    fn fetch_all(&mut self) -> Result<Vec<Row>, ErrorRecord> {
        Ok(self.pending.drain(..).collect())
    }

    fn affected_rows(&self) -> usize {
        self.affected
    }

    fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    fn begin_transaction(&mut self) -> Result<(), ErrorRecord> {
        self.conn.begin(TransactionBehavior::Deferred)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ErrorRecord> {
        self.conn.commit()?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ErrorRecord> {
        self.conn.rollback()?;
        Ok(())
    }
}
