//! Result rows and cells.

use std::sync::Arc;

use crate::error::ShapeError;

/// One column value of a fetched row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Binary blob.
    Blob(Vec<u8>),
}

impl Cell {
    /// Returns `true` for SQL NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The integer value, if this is an integer cell.
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// The text value, if this is a text cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<querykit_db::Value> for Cell {
    fn from(value: querykit_db::Value) -> Self {
        match value {
            querykit_db::Value::Null => Self::Null,
            querykit_db::Value::Integer(v) => Self::Integer(v),
            querykit_db::Value::Real(v) => Self::Real(v),
            querykit_db::Value::Text(v) => Self::Text(v),
            querykit_db::Value::Blob(v) => Self::Blob(v),
        }
    }
}

/// A fetched row: column names plus values, addressable by position or name.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Cell>,
}

impl Row {
    /// Creates a row. `columns` is usually shared by every row of a result.
    pub const fn new(columns: Arc<[String]>, values: Vec<Cell>) -> Self {
        Self { columns, values }
    }

    /// Creates a row from `(column, value)` pairs.
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Cell)>) -> Self {
        let (columns, values): (Vec<String>, Vec<Cell>) = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .unzip();
        Self::new(columns.into(), values)
    }

    /// The value at position `idx`.
    pub fn get(&self, idx: usize) -> Option<&Cell> {
        self.values.get(idx)
    }

    /// The value of the column called `name`.
    pub fn get_named(&self, name: &str) -> Option<&Cell> {
        self.columns
            .iter()
            .position(|column| column == name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in column order.
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    /// Number of fields in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` for a row without fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One column gathered from every row of a multi-row fetch.
///
/// Rows that lack the column contribute a [`ShapeError`] instead of a value;
/// they never abort the rest of the fetch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnFetch {
    /// Values of the rows that have the column, in row order.
    pub values: Vec<Cell>,
    /// One entry per row that lacks the column.
    pub errors: Vec<ShapeError>,
}

impl ColumnFetch {
    /// Collects column `column` from `rows`.
    pub fn collect(rows: &[Row], column: usize) -> Self {
        let mut fetch = Self::default();
        for (idx, row) in rows.iter().enumerate() {
            match row.get(column) {
                Some(value) => fetch.values.push(value.clone()),
                None => fetch.errors.push(ShapeError {
                    row: Some(idx),
                    column,
                }),
            }
        }
        fetch
    }

    /// Number of rows the column was gathered from.
    pub fn rows_seen(&self) -> usize {
        self.values.len() + self.errors.len()
    }
}
