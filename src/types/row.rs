use std::collections::HashMap;

use crate::{
    error::{RelqError, Result},
    traits::{Column, ColumnValue},
    types::SqlValue,
};

/// Driver-agnostic raw result from a database statement.
#[derive(Debug, Clone, Default)]
pub struct RawQueryResult {
    /// Column names in order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of values in column order
    pub rows: Vec<Vec<SqlValue>>,
    /// Number of rows touched by an INSERT/UPDATE/DELETE
    pub rows_affected: u64,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A result that only reports an affected-row count.
    pub fn affected(count: u64) -> Self {
        Self {
            rows_affected: count,
            ..Self::default()
        }
    }
}

/// A single row keyed by column name.
///
/// Rows are also the value map entities are rebuilt from and flattened into.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, SqlValue>,
}

impl Row {
    /// Creates a new Row from column names and values.
    pub(crate) fn new(columns: &[String], values: Vec<SqlValue>) -> Self {
        let values = columns
            .iter()
            .zip(values)
            .map(|(col, val)| (col.clone(), val))
            .collect();
        Self { values }
    }

    /// Adds a typed column value, consuming and returning the row.
    pub fn with<T: ColumnValue>(mut self, column: &Column<T>, value: &T) -> Self {
        self.set(column, value);
        self
    }

    /// Sets a typed column value.
    pub fn set<T: ColumnValue>(&mut self, column: &Column<T>, value: &T) {
        self.values
            .insert(column.column_name().to_string(), value.to_sql());
    }

    /// Sets a raw value by column name.
    pub fn set_value(&mut self, column: impl Into<String>, value: SqlValue) {
        self.values.insert(column.into(), value);
    }

    /// Gets a value by column.
    pub fn get<T: ColumnValue>(&self, column: &Column<T>) -> Result<&SqlValue> {
        self.values
            .get(column.column_name())
            .ok_or_else(|| RelqError::ColumnNotFound(column.qualified_name()))
    }

    /// Gets a value by column name.
    pub fn get_by_name(&self, column: &str) -> Result<&SqlValue> {
        self.values
            .get(column)
            .ok_or_else(|| RelqError::ColumnNotFound(column.to_string()))
    }

    /// Gets a value by column and converts it to the column's Rust type.
    pub fn value<T: ColumnValue>(&self, column: &Column<T>) -> Result<T> {
        let raw = self.get(column)?.clone();
        T::from_sql(raw).map_err(|e| RelqError::Mapping(format!("{}: {e}", column.qualified_name())))
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> Vec<&str> {
        self.values.keys().map(|s| s.as_str()).collect()
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of a query execution, containing zero or more rows.
#[derive(Debug)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl QueryResult {
    /// Creates a QueryResult from a RawQueryResult.
    pub fn from_raw(raw: RawQueryResult) -> Self {
        let rows = raw
            .rows
            .into_iter()
            .map(|values| Row::new(&raw.columns, values))
            .collect();
        Self {
            columns: raw.columns,
            rows,
        }
    }

    /// Extracts a single row from the result.
    /// Returns an error if the result contains zero or more than one row.
    pub fn single_row(self) -> Result<Row> {
        let actual = self.rows.len();
        let mut rows = self.rows.into_iter();
        match (rows.next(), rows.next()) {
            (Some(row), None) => Ok(row),
            _ => Err(RelqError::UnexpectedRowCount {
                expected: 1,
                actual,
            }),
        }
    }

    /// Returns all rows from the result.
    pub fn rows(self) -> Vec<Row> {
        self.rows
    }

    /// Returns a reference to the rows without consuming the result.
    pub fn rows_ref(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the column names from this result.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of rows in this result.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if this result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
