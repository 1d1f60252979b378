//! Materialized result sets and row views.

use std::ops::Range;
use std::sync::Arc;

use crate::value::SqlValue;

/// One result set: column names and value rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Arc<[String]>,
    rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    /// Creates an empty result set with the given columns.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: columns.into(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. Rows shorter or longer than the column list are kept
    /// as-is; consumers check widths.
    pub fn push(&mut self, row: Vec<SqlValue>) {
        self.rows.push(row);
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates over the rows.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// Returns the first column of the first row, if any.
    #[must_use]
    pub fn scalar(&self) -> Option<&SqlValue> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// A view over one row, or a column range of it.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [SqlValue],
}

impl<'a> Row<'a> {
    /// Creates a row view.
    #[must_use]
    pub const fn new(columns: &'a [String], values: &'a [SqlValue]) -> Self {
        Self { columns, values }
    }

    /// Returns the value of a named column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a SqlValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }

    /// Returns the value at a position.
    #[must_use]
    pub fn value(&self, idx: usize) -> Option<&'a SqlValue> {
        self.values.get(idx)
    }

    /// Returns the column names of this view.
    #[must_use]
    pub const fn columns(&self) -> &'a [String] {
        self.columns
    }

    /// Returns the values of this view.
    #[must_use]
    pub const fn values(&self) -> &'a [SqlValue] {
        self.values
    }

    /// Returns the number of values.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the view has no values.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a sub-view over a column range, or `None` if out of bounds.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Option<Row<'a>> {
        Some(Row {
            columns: self.columns.get(range.clone())?,
            values: self.values.get(range)?,
        })
    }

    /// Returns true if every value is NULL.
    #[must_use]
    pub fn is_all_null(&self) -> bool {
        self.values.iter().all(SqlValue::is_null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        let mut set = ResultSet::new(vec!["a".into(), "b".into(), "c".into()]);
        set.push(vec![SqlValue::Int(1), SqlValue::Null, SqlValue::Null]);
        set
    }

    #[test]
    fn test_row_access() {
        let set = sample();
        let row = set.rows().next().unwrap();
        assert_eq!(row.get("a"), Some(&SqlValue::Int(1)));
        assert_eq!(row.get("z"), None);
        assert_eq!(row.len(), 3);
        assert_eq!(set.scalar(), Some(&SqlValue::Int(1)));
    }

    #[test]
    fn test_row_slice() {
        let set = sample();
        let row = set.rows().next().unwrap();
        let tail = row.slice(1..3).unwrap();
        assert_eq!(tail.columns(), ["b".to_string(), "c".to_string()]);
        assert!(tail.is_all_null());
        assert!(!row.is_all_null());
        assert!(row.slice(2..5).is_none());
    }
}
