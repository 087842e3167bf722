//! The capability a database driver provides to the engine.

use crate::binder::BindingMode;
use crate::error::ErrorRecord;
use crate::row::Row;
use crate::value::{ParamType, Scalar};

/// A native database driver seen through a single statement slot.
///
/// Preparing a statement replaces the previous one. `bind`, `execute` and
/// the fetch methods act on whatever statement is currently prepared and
/// report a native [`ErrorRecord`] on failure.
pub trait Backend {
    /// The binding mode this backend prefers when the configuration does
    /// not name one.
    fn binding_mode(&self) -> BindingMode;

    /// `name` as a quoted identifier.
    fn quote_identifier(&self, name: &str) -> String;

    /// The escaped contents of a string literal, without surrounding quotes.
    fn escape_string(&self, raw: &str) -> String;

    /// Prepares `sql` into the statement slot.
    ///
    /// # Errors
    ///
    /// Returns the native error if the statement does not compile.
    fn prepare(&mut self, sql: &str) -> Result<(), ErrorRecord>;

    /// Binds `value` as `param_type` to the placeholder `key`.
    ///
    /// # Errors
    ///
    /// Returns the native error if no statement is prepared or the
    /// statement has no such placeholder.
    fn bind(&mut self, key: &str, value: &Scalar, param_type: ParamType)
        -> Result<(), ErrorRecord>;

    /// Executes the prepared statement with its current bindings.
    ///
    /// # Errors
    ///
    /// Returns the native error if execution fails.
    fn execute(&mut self) -> Result<(), ErrorRecord>;

    /// The next row of the last execution, if any remain.
    ///
    /// # Errors
    ///
    /// Returns the native error if reading the row fails.
    fn fetch_row(&mut self) -> Result<Option<Row>, ErrorRecord>;

    /// Every remaining row of the last execution.
    ///
    /// # Errors
    ///
    /// Returns the native error if reading the rows fails.
    fn fetch_all(&mut self) -> Result<Vec<Row>, ErrorRecord>;

    /// Rows changed by the last data-modifying execution.
    fn affected_rows(&self) -> usize;

    /// Row id of the most recent successful insert.
    fn last_insert_id(&self) -> i64;

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns the native error if a transaction is already open or the
    /// driver refuses.
    fn begin_transaction(&mut self) -> Result<(), ErrorRecord>;

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns the native error if no transaction is open or the commit fails.
    fn commit(&mut self) -> Result<(), ErrorRecord>;

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns the native error if no transaction is open.
    fn rollback(&mut self) -> Result<(), ErrorRecord>;
}
