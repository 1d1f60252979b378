//! SQL statement generation.
//!
//! [`StatementGenerator`] turns entities, [`Patch`]es and [`Query`]s into
//! [`SqlStatement`]s: SQL text, the named parameters it binds and the
//! [`StatementKind`] that tells the executor how to run it.

mod generator;
mod join;
mod query;

pub use generator::StatementGenerator;
pub use join::{AliasMap, Join, JoinKind, JoinSource};
pub use query::{OrderBy, OrderDirection, Query};

use std::fmt;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::predicate::Parameter;
use crate::value::{SqlValue, ToSqlValue};

/// How a statement is executed and what it yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Insert returning the generated identity as a scalar.
    Insert,
    /// Single scalar result.
    Scalar,
    /// Update returning the affected row count.
    Update,
    /// Delete returning the affected row count.
    Delete,
    /// Row-returning select.
    Select,
    /// Stored procedure call returning rows.
    Procedure,
    /// Several `;`-separated statements, each returning a result set.
    MultiResult,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Insert => "insert",
            Self::Scalar => "scalar",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Select => "select",
            Self::Procedure => "procedure",
            Self::MultiResult => "multi-result",
        };
        f.write_str(s)
    }
}

/// A generated statement: SQL text, named parameters and kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    /// SQL text with dialect placeholders.
    pub sql: String,
    /// Parameters in binding order, unique by name.
    pub params: Vec<Parameter>,
    /// Calling convention.
    pub kind: StatementKind,
}

impl SqlStatement {
    /// Creates a statement from raw parts, e.g. a stored procedure call.
    pub fn new(sql: impl Into<String>, params: Vec<Parameter>, kind: StatementKind) -> Self {
        Self {
            sql: sql.into(),
            params,
            kind,
        }
    }

    /// Returns the value bound under a parameter name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&SqlValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Rewrites the named placeholders of `dialect` into positional `$n`
    /// markers, for drivers that only bind by position (PostgreSQL's
    /// native protocol). `$n` is the 1-based index of the parameter in
    /// [`SqlStatement::params`]; the returned values follow that order.
    /// Placeholders naming no parameter are left untouched.
    #[must_use]
    pub fn numbered(&self, dialect: &dyn Dialect) -> (String, Vec<SqlValue>) {
        let prefix = dialect.parameter_prefix();
        let mut sql = String::with_capacity(self.sql.len());
        let mut chars = self.sql.char_indices().peekable();
        while let Some((start, c)) = chars.next() {
            if c != prefix {
                sql.push(c);
                continue;
            }
            let mut end = start + c.len_utf8();
            while let Some(&(idx, next)) = chars.peek() {
                if !(next.is_alphanumeric() || next == '_') {
                    break;
                }
                end = idx + next.len_utf8();
                chars.next();
            }
            let name = &self.sql[start + c.len_utf8()..end];
            match self.params.iter().position(|p| p.name == name) {
                Some(idx) if !name.is_empty() => sql.push_str(&format!("${}", idx + 1)),
                _ => sql.push_str(&self.sql[start..end]),
            }
        }
        let values = self.params.iter().map(|p| p.value.clone()).collect();
        (sql, values)
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// An ordered list of column assignments for a predicate-scoped update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    assignments: Vec<(String, SqlValue)>,
}

impl Patch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column to a value.
    #[must_use]
    pub fn set<V: ToSqlValue>(mut self, column: impl Into<String>, value: V) -> Self {
        self.assignments.push((column.into(), value.to_sql_value()));
        self
    }

    /// Returns the assignments in order.
    #[must_use]
    pub fn assignments(&self) -> &[(String, SqlValue)] {
        &self.assignments
    }

    /// Returns true if the patch assigns nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Page number, starting at 1.
    pub number: u64,
    /// Rows per page.
    pub size: u64,
}

impl Page {
    /// Creates a page request.
    #[must_use]
    pub const fn new(number: u64, size: u64) -> Self {
        Self { number, size }
    }

    /// Checks that both number and size are at least 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPagination`] otherwise.
    pub fn validate(&self) -> Result<()> {
        if self.number == 0 {
            return Err(Error::InvalidPagination(
                "page number starts at 1".to_string(),
            ));
        }
        if self.size == 0 {
            return Err(Error::InvalidPagination(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of rows before this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.number.saturating_sub(1).saturating_mul(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        let page = Page::new(3, 25);
        assert_eq!(page.offset(), 50);
        assert!(page.validate().is_ok());
        assert!(Page::new(0, 10).validate().is_err());
        assert!(Page::new(1, 0).validate().is_err());
    }

    #[test]
    fn test_numbered_placeholders() {
        let stmt = SqlStatement::new(
            "SELECT * FROM t WHERE (a = @rating) AND (b = @rating2) AND (c = @rating); SELECT @other",
            vec![
                Parameter::new("rating", SqlValue::Int(1)),
                Parameter::new("rating2", SqlValue::Int(2)),
            ],
            StatementKind::MultiResult,
        );
        let (sql, values) = stmt.numbered(&crate::dialect::PostgresDialect);
        assert_eq!(
            sql,
            "SELECT * FROM t WHERE (a = $1) AND (b = $2) AND (c = $1); SELECT @other"
        );
        assert_eq!(values, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    fn test_patch_keeps_order() {
        let patch = Patch::new().set("title", "a").set("rating", 3);
        let columns: Vec<_> = patch.assignments().iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(columns, vec!["title", "rating"]);
        assert!(Patch::new().is_empty());
    }
}
