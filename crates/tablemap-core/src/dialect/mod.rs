//! SQL Dialect support.
//!
//! Different databases have slightly different SQL syntax. This module provides
//! a trait for dialect-specific behavior: identifier quoting, parameter
//! placeholders, paging style, how an insert reports the generated identity
//! and which column type backs each Rust field type.

mod postgres;
mod sqlite;
mod sqlserver;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use crate::error::{Error, Result};
use crate::registry::TableName;

/// How a dialect restricts a select to one page of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// `LIMIT n OFFSET m` appended after ORDER BY.
    LimitOffset,
    /// A `ROW_NUMBER() OVER (ORDER BY ...)` wrapper filtered on the row number.
    RowNumber,
}

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character (e.g., `"` for standard SQL).
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Returns the prefix of named parameter placeholders.
    fn parameter_prefix(&self) -> char {
        '@'
    }

    /// Returns the paging style.
    fn pagination(&self) -> PaginationStyle {
        PaginationStyle::LimitOffset
    }

    /// Returns the SQL appended to an insert so that it yields the generated
    /// identity as a scalar. `identity` is already quoted.
    fn identity_suffix(&self, identity: &str) -> String;

    /// Returns the column type for a normalized Rust type name.
    fn type_for(&self, rust_type: &str) -> Option<&'static str>;

    /// Quotes an identifier, doubling any embedded quote character.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        let doubled = format!("{quote}{quote}");
        format!("{quote}{}{quote}", name.replace(quote, &doubled))
    }

    /// Quotes a resolved table name, including its schema.
    fn quote_table(&self, table: &TableName) -> String {
        match &table.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(&table.name)
            ),
            None => self.quote_identifier(&table.name),
        }
    }

    /// Renders a named parameter placeholder.
    fn parameter(&self, name: &str) -> String {
        format!("{}{name}", self.parameter_prefix())
    }

    /// Returns the column type for a Rust type as declared on an entity
    /// field. `Option<T>` maps like `T` and paths are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMappingMissing`] if the dialect has no mapping.
    fn column_type(&self, rust_type: &str) -> Result<&'static str> {
        let normalized = normalize_rust_type(rust_type);
        self.type_for(&normalized)
            .ok_or_else(|| Error::TypeMappingMissing {
                dialect: self.name(),
                rust_type: rust_type.to_string(),
            })
    }
}

/// Strips whitespace, `Option<...>` wrappers and module paths from a Rust
/// type name, so `Option<chrono::DateTime<chrono::Utc>>` becomes
/// `DateTime<Utc>`.
#[must_use]
pub fn normalize_rust_type(rust_type: &str) -> String {
    let mut out = String::with_capacity(rust_type.len());
    let mut segment_start = 0;
    let mut chars = rust_type.chars().filter(|c| !c.is_whitespace()).peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                out.truncate(segment_start);
            }
            '<' | '>' | ',' | '(' | ')' | '[' | ']' | ';' | '&' => {
                out.push(c);
                segment_start = out.len();
            }
            _ => out.push(c),
        }
    }

    let mut inner = out.as_str();
    while let Some(rest) = inner
        .strip_prefix("Option<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        inner = rest;
    }
    inner.to_string()
}
