//! The query executor.
//!
//! [`Database`] turns a template and a [`ParameterSet`] into a result:
//!
//! 1. table tokens are rewritten with the configured prefix,
//! 2. parameters are bound in the configured (or backend-preferred) mode,
//! 3. with caching on, the inline rendering plus the fetch shape is looked
//!    up and a hit is returned without touching the backend,
//! 4. otherwise the statement is prepared, bound and executed, the result
//!    is fetched in the requested shape, and the first success is cached.
//!
//! Exactly one statement is live at a time. Issuing a new template
//! discards the previous statement:
//!
//! ```text
//! Idle -> (render + bind) -> Prepared -> (execute) -> Executed -> (fetch) -> Idle
//! ```
//!
//! Every failure is returned as a [`QueryError`], kept as the last error,
//! and appended to the error log. Every success clears the last error.

use std::mem;

use crate::backend::Backend;
use crate::binder::{self, Binding, BindingMode, BoundStatement};
use crate::cache::{CacheKey, CachedResult, FetchShape, StatementCache};
use crate::config::{ConnectionConfig, DatabaseConfig};
use crate::error::{ErrorRecord, QueryError, QueryResult, ShapeError};
use crate::row::{Cell, ColumnFetch, Row};
use crate::sqlite::SqliteBackend;
use crate::template;
use crate::value::{Param, ParameterSet, Value};

/// Where the live statement is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No statement, or the last one was fully fetched.
    #[default]
    Idle,
    /// Rendered, prepared and bound, not yet executed.
    Prepared,
    /// Executed; rows may be waiting to be fetched.
    Executed,
}

/// Row and field count of the most recent fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionStats {
    /// Rows in the fetched result.
    pub row_count: usize,
    /// Fields per row (of the first row for multi-row fetches).
    pub field_count: usize,
}

impl ExecutionStats {
    /// Stats of a single-value fetch.
    pub const SCALAR: Self = Self {
        row_count: 1,
        field_count: 1,
    };

    /// Stats of a multi-row fetch.
    pub fn of_rows(rows: &[Row]) -> Self {
        Self {
            row_count: rows.len(),
            field_count: rows.first().map_or(0, Row::len),
        }
    }

    /// Stats of a single-row fetch.
    pub fn of_row(row: Option<&Row>) -> Self {
        row.map_or_else(Self::default, |row| Self {
            row_count: 1,
            field_count: row.len(),
        })
    }

    /// Stats of a column fetch.
    pub fn of_column(fetch: &ColumnFetch) -> Self {
        Self {
            row_count: fetch.rows_seen(),
            field_count: 1,
        }
    }
}

/// A database connection driven through templates.
///
/// ```no_run
/// use querykit_core::{params, ConnectionConfig, Database, DatabaseConfig};
///
/// let config = ConnectionConfig::new("app.sqlite", DatabaseConfig::with_prefix("app_"));
/// let mut db = Database::open(&config)?;
/// db.execute(
///     "INSERT INTO {users} (name) VALUES (:name)",
///     &params! { ":name" => "alice" },
/// )?;
/// let name = db.query_scalar(
///     "SELECT name FROM {users} WHERE id = :id",
///     &params! { ":id" => db.last_insert_id() },
/// )?;
/// assert_eq!(name.as_str(), Some("alice"));
/// # Ok::<(), querykit_core::QueryError>(())
/// ```
#[derive(Debug)]
pub struct Database<B: Backend> {
    backend: B,
    config: DatabaseConfig,
    phase: Phase,
    statement: Option<BoundStatement>,
    stats: Option<ExecutionStats>,
    last_error: Option<QueryError>,
    error_log: Vec<QueryError>,
    cache: Option<StatementCache>,
}

impl Database<SqliteBackend> {
    /// Opens a `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Connection`] if the database cannot be opened.
    /// No instance exists in that case.
    pub fn open(config: &ConnectionConfig) -> QueryResult<Self> {
        let backend = SqliteBackend::connect(config).inspect_err(|err| {
            log::warn!("failed to open {}: {err}", config.path.display());
        })?;
        Ok(Self::with_backend(backend, config.database.clone()))
    }
}

impl<B: Backend> Database<B> {
    /// Drives `backend` with `config`.
    pub fn with_backend(backend: B, config: DatabaseConfig) -> Self {
        let cache = config.cache_results.then(StatementCache::new);
        Self {
            backend,
            config,
            phase: Phase::Idle,
            statement: None,
            stats: None,
            last_error: None,
            error_log: Vec::new(),
            cache,
        }
    }

    /// The configured binding mode, or the backend's preference.
    pub fn binding_mode(&self) -> BindingMode {
        self.config
            .binding_mode
            .unwrap_or_else(|| self.backend.binding_mode())
    }

    /// Renders `template` with `params` without executing it.
    pub fn render(&self, template: &str, params: &ParameterSet) -> BoundStatement {
        self.bind_params(&self.rewrite_tables(template), params)
    }

    fn rewrite_tables(&self, template: &str) -> String {
        template::rewrite(template, &self.config.table_prefix, |name| {
            self.backend.quote_identifier(name)
        })
    }

    fn bind_params(&self, sql: &str, params: &ParameterSet) -> BoundStatement {
        binder::bind(sql, params, self.binding_mode(), |raw| {
            self.backend.escape_string(raw)
        })
    }

    /// Runs `template` and returns every row.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Backend`] if preparing, executing or fetching
    /// fails, and [`QueryError::Binding`] if a value cannot be bound.
    pub fn query(&mut self, template: &str, params: &ParameterSet) -> QueryResult<Vec<Row>> {
        let (sql, key) = self.start_fetch(template, params, FetchShape::All);
        if let Some(CachedResult::Rows(rows)) = self.cache_hit(key.as_ref()) {
            return Ok(rows);
        }
        self.run_rendered(&sql, params)?;
        let rows = self.drain_rows()?;
        self.finish_fetch(key, ExecutionStats::of_rows(&rows), || {
            CachedResult::Rows(rows.clone())
        });
        Ok(rows)
    }

    /// Runs `template` and returns its first row, or `None` if it matched
    /// nothing.
    ///
    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub fn query_row(
        &mut self,
        template: &str,
        params: &ParameterSet,
    ) -> QueryResult<Option<Row>> {
        let (sql, key) = self.start_fetch(template, params, FetchShape::Row);
        if let Some(CachedResult::Row(row)) = self.cache_hit(key.as_ref()) {
            return Ok(row);
        }
        self.run_rendered(&sql, params)?;
        let row = self.next_row()?;
        self.phase = Phase::Idle;
        self.finish_fetch(key, ExecutionStats::of_row(row.as_ref()), || {
            CachedResult::Row(row.clone())
        });
        Ok(row)
    }

    /// Runs `template` and returns the first column of its first row.
    ///
    /// # Errors
    ///
    /// See [`query_scalar_at`](Self::query_scalar_at).
    pub fn query_scalar(&mut self, template: &str, params: &ParameterSet) -> QueryResult<Cell> {
        self.query_scalar_at(template, params, 0)
    }

    /// Runs `template` and returns column `column` of its first row.
    ///
    /// A NULL column is a value, not a failure.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NoRows`] if the query matched nothing and
    /// [`QueryError::Shape`] if the row has no such column, besides the
    /// errors of [`query`](Self::query).
    pub fn query_scalar_at(
        &mut self,
        template: &str,
        params: &ParameterSet,
        column: usize,
    ) -> QueryResult<Cell> {
        let (sql, key) = self.start_fetch(template, params, FetchShape::Scalar(column));
        if let Some(CachedResult::Scalar(cell)) = self.cache_hit(key.as_ref()) {
            return Ok(cell);
        }
        self.run_rendered(&sql, params)?;
        let row = self.next_row()?;
        self.phase = Phase::Idle;
        self.stats = Some(ExecutionStats::of_row(row.as_ref()));
        let Some(row) = row else {
            return Err(self.fail(QueryError::NoRows));
        };
        let Some(cell) = row.get(column).cloned() else {
            return Err(self.fail(QueryError::Shape(ShapeError { row: None, column })));
        };
        self.finish_fetch(key, ExecutionStats::SCALAR, || {
            CachedResult::Scalar(cell.clone())
        });
        Ok(cell)
    }

    /// Runs `template` and returns the first column of every row.
    ///
    /// # Errors
    ///
    /// See [`query_column_at`](Self::query_column_at).
    pub fn query_column(
        &mut self,
        template: &str,
        params: &ParameterSet,
    ) -> QueryResult<ColumnFetch> {
        self.query_column_at(template, params, 0)
    }

    /// Runs `template` and returns column `column` of every row.
    ///
    /// Rows without that column do not fail the call: each one is reported
    /// in [`ColumnFetch::errors`] and appended to the error log.
    ///
    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub fn query_column_at(
        &mut self,
        template: &str,
        params: &ParameterSet,
        column: usize,
    ) -> QueryResult<ColumnFetch> {
        let (sql, key) = self.start_fetch(template, params, FetchShape::Column(column));
        if let Some(CachedResult::Column(fetch)) = self.cache_hit(key.as_ref()) {
            return Ok(fetch);
        }
        self.run_rendered(&sql, params)?;
        let rows = self.drain_rows()?;
        let fetch = ColumnFetch::collect(&rows, column);
        for shape in &fetch.errors {
            self.log_error(QueryError::Shape(*shape));
        }
        self.finish_fetch(key, ExecutionStats::of_column(&fetch), || {
            CachedResult::Column(fetch.clone())
        });
        Ok(fetch)
    }

    /// Runs `template` without fetching and returns the affected row count.
    ///
    /// Rows produced by the statement stay available to
    /// [`fetch_row`](Self::fetch_row) and [`fetch_all`](Self::fetch_all).
    ///
    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub fn execute(&mut self, template: &str, params: &ParameterSet) -> QueryResult<usize> {
        let sql = self.rewrite_tables(template);
        self.run_rendered(&sql, params)?;
        Ok(self.backend.affected_rows())
    }

    /// Renders, prepares and binds `template` without executing it.
    ///
    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub fn prepare(&mut self, template: &str, params: &ParameterSet) -> QueryResult<()> {
        let bound = self.render(template, params);
        self.load(bound)
    }

    /// Binds one more value to the live statement, replacing any value
    /// bound to `key` before.
    ///
    /// `type_tag` names a [`ParamType`](crate::ParamType); unknown tags fall
    /// back to inference.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Binding`] if no statement is live, the value is
    /// a list, or the backend refuses the binding.
    pub fn bind_value(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        type_tag: Option<&str>,
    ) -> QueryResult<()> {
        if self.statement.is_none() {
            return Err(self.fail(QueryError::Binding(
                "no valid statement set for binding".to_owned(),
            )));
        }
        let param = Param {
            value: value.into(),
            type_tag: type_tag.map(str::to_owned),
        };
        let param_type = param.resolved_type();
        let Some(scalar) = param.value.into_scalar() else {
            return Err(self.fail(QueryError::Binding(format!(
                "list value for {key} must be supplied when the statement is prepared"
            ))));
        };
        self.backend
            .bind(key, &scalar, param_type)
            .map_err(|record| self.fail(QueryError::Binding(record.to_string())))?;
        if let Some(statement) = self.statement.as_mut() {
            let binding = Binding {
                key: key.to_owned(),
                value: scalar,
                param_type,
            };
            match statement.bindings.iter_mut().find(|b| b.key == key) {
                Some(slot) => *slot = binding,
                None => statement.bindings.push(binding),
            }
        }
        self.phase = Phase::Prepared;
        self.last_error = None;
        Ok(())
    }

    /// Executes the live statement again with its current bindings and
    /// returns the affected row count.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Binding`] if no statement is live and
    /// [`QueryError::Backend`] if execution fails.
    pub fn execute_prepared(&mut self) -> QueryResult<usize> {
        self.execute_live()?;
        Ok(self.backend.affected_rows())
    }

    /// Fetches the next row of the executed statement.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Binding`] if nothing was executed and
    /// [`QueryError::Backend`] if the fetch fails.
    pub fn fetch_row(&mut self) -> QueryResult<Option<Row>> {
        self.require_executed()?;
        let row = self.next_row()?;
        self.stats = Some(ExecutionStats::of_row(row.as_ref()));
        if row.is_none() {
            self.phase = Phase::Idle;
        }
        self.last_error = None;
        Ok(row)
    }

    /// Fetches every remaining row of the executed statement.
    ///
    /// # Errors
    ///
    /// See [`fetch_row`](Self::fetch_row).
    pub fn fetch_all(&mut self) -> QueryResult<Vec<Row>> {
        self.require_executed()?;
        let rows = self.drain_rows()?;
        self.stats = Some(ExecutionStats::of_rows(&rows));
        self.last_error = None;
        Ok(rows)
    }

    /// Opens a transaction. Returns `false` and records the error on failure.
    pub fn begin_transaction(&mut self) -> bool {
        self.transaction(B::begin_transaction)
    }

    /// Commits the open transaction. Returns `false` and records the error
    /// on failure.
    pub fn commit(&mut self) -> bool {
        self.transaction(B::commit)
    }

    /// Rolls back the open transaction. Returns `false` and records the
    /// error on failure.
    pub fn rollback(&mut self) -> bool {
        self.transaction(B::rollback)
    }

    fn transaction(&mut self, op: impl FnOnce(&mut B) -> Result<(), ErrorRecord>) -> bool {
        match op(&mut self.backend) {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(record) => {
                self.fail(QueryError::Backend(record));
                false
            }
        }
    }

    /// Row id of the most recent insert.
    pub fn last_insert_id(&self) -> i64 {
        self.backend.last_insert_id()
    }

    /// Rows changed by the last data-modifying statement.
    pub fn affected_rows(&self) -> usize {
        self.backend.affected_rows()
    }

    /// Rows in the most recent fetch. `None` until something was fetched.
    pub fn row_count(&self) -> Option<usize> {
        self.stats.map(|stats| stats.row_count)
    }

    /// Fields per row of the most recent fetch. `None` until something was
    /// fetched.
    pub fn field_count(&self) -> Option<usize> {
        self.stats.map(|stats| stats.field_count)
    }

    /// The error of the last operation, cleared by every success.
    pub const fn last_error(&self) -> Option<&QueryError> {
        self.last_error.as_ref()
    }

    /// Every error recorded since the log was last drained.
    pub fn errors(&self) -> &[QueryError] {
        &self.error_log
    }

    /// Drains the error log.
    pub fn take_errors(&mut self) -> Vec<QueryError> {
        mem::take(&mut self.error_log)
    }

    /// The live statement and its bindings.
    pub const fn last_statement(&self) -> Option<&BoundStatement> {
        self.statement.as_ref()
    }

    /// Lifecycle position of the live statement.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The prefix prepended to table tokens.
    pub fn table_prefix(&self) -> &str {
        &self.config.table_prefix
    }

    /// The engine configuration.
    pub const fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Number of cached results. Always 0 with caching off.
    pub fn cached_statements(&self) -> usize {
        self.cache.as_ref().map_or(0, StatementCache::len)
    }

    /// The backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably. Statements run directly against it bypass the
    /// engine's bookkeeping.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn start_fetch(
        &self,
        template: &str,
        params: &ParameterSet,
        shape: FetchShape,
    ) -> (String, Option<CacheKey>) {
        let sql = self.rewrite_tables(template);
        // Inline text folds `true` and `'1'` together, so prepared keys carry
        // the typed bindings.
        let key = self.cache.is_some().then(|| {
            let statement = match self.binding_mode() {
                BindingMode::Inline => {
                    binder::render_inline(&sql, params, |raw| self.backend.escape_string(raw))
                }
                BindingMode::Prepared => self.bind_params(&sql, params).to_string(),
            };
            CacheKey::new(statement, shape)
        });
        (sql, key)
    }

    fn cache_hit(&mut self, key: Option<&CacheKey>) -> Option<CachedResult> {
        let hit = self
            .cache
            .as_ref()
            .zip(key)
            .and_then(|(cache, key)| cache.lookup(key))
            .cloned()?;
        if let Some(key) = key {
            log::trace!("cache hit ({:?}): {}", key.shape, key.statement);
        }
        self.stats = Some(hit.stats());
        self.last_error = None;
        Some(hit)
    }

    fn finish_fetch(
        &mut self,
        key: Option<CacheKey>,
        stats: ExecutionStats,
        result: impl FnOnce() -> CachedResult,
    ) {
        self.stats = Some(stats);
        self.last_error = None;
        if let (Some(cache), Some(key)) = (self.cache.as_mut(), key) {
            cache.store(key, result());
        }
    }

    fn run_rendered(&mut self, sql: &str, params: &ParameterSet) -> QueryResult<()> {
        let bound = self.bind_params(sql, params);
        self.load(bound)?;
        self.execute_live()
    }

    fn load(&mut self, bound: BoundStatement) -> QueryResult<()> {
        self.statement = None;
        self.phase = Phase::Idle;
        log::debug!("rendered statement: {}", bound.sql);
        self.backend
            .prepare(&bound.sql)
            .map_err(|record| self.fail(QueryError::Backend(record)))?;
        for binding in &bound.bindings {
            self.backend
                .bind(&binding.key, &binding.value, binding.param_type)
                .map_err(|record| {
                    self.fail(QueryError::Binding(format!(
                        "cannot bind {}: {record}",
                        binding.key
                    )))
                })?;
        }
        self.statement = Some(bound);
        self.phase = Phase::Prepared;
        self.last_error = None;
        Ok(())
    }

    fn execute_live(&mut self) -> QueryResult<()> {
        if self.statement.is_none() {
            return Err(self.fail(QueryError::Binding(
                "no valid statement set to execute".to_owned(),
            )));
        }
        self.backend
            .execute()
            .map_err(|record| self.fail(QueryError::Backend(record)))?;
        self.phase = Phase::Executed;
        self.last_error = None;
        Ok(())
    }

    fn require_executed(&mut self) -> QueryResult<()> {
        if self.phase == Phase::Executed {
            return Ok(());
        }
        Err(self.fail(QueryError::Binding(
            "no executed statement to fetch from".to_owned(),
        )))
    }

    fn next_row(&mut self) -> QueryResult<Option<Row>> {
        self.backend
            .fetch_row()
            .map_err(|record| self.fail(QueryError::Backend(record)))
    }

    fn drain_rows(&mut self) -> QueryResult<Vec<Row>> {
        let rows = self
            .backend
            .fetch_all()
            .map_err(|record| self.fail(QueryError::Backend(record)))?;
        self.phase = Phase::Idle;
        Ok(rows)
    }

    /// Records `err` as the last error and returns it.
    fn fail(&mut self, err: QueryError) -> QueryError {
        self.last_error = Some(err.clone());
        self.log_error(err.clone());
        err
    }

    fn log_error(&mut self, err: QueryError) {
        log::warn!("{err}");
        self.error_log.push(err);
    }
}

#[cfg(test)]
mod tests;
