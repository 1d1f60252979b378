//! Error types for statement compilation and hydration.

use thiserror::Error;

use crate::value::ValueError;

/// Errors raised before a statement reaches the database, or while turning
/// rows back into entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The predicate uses a shape the compiler does not translate.
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// Paging was requested in a way that cannot be generated.
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    /// The entity type declares no identity column.
    #[error("entity '{entity}' declares no identity column")]
    MissingIdentity {
        /// Entity type name.
        entity: &'static str,
    },

    /// The dialect has no column type for a Rust type.
    #[error("dialect '{dialect}' has no column type for '{rust_type}'")]
    TypeMappingMissing {
        /// Dialect name.
        dialect: &'static str,
        /// Rust type name as declared on the entity.
        rust_type: String,
    },

    /// A join or column reference names an alias that was never assigned.
    #[error("unresolved alias: {0}")]
    UnresolvedAlias(String),

    /// A column value could not be stored into its field.
    #[error("cannot convert column '{column}': {source}")]
    ValueConversion {
        /// Column name.
        column: String,
        /// Underlying conversion failure.
        #[source]
        source: ValueError,
    },

    /// A joined row does not have the width the join declares.
    #[error("row has {actual} columns, join layout expects {expected}")]
    ColumnCountMismatch {
        /// Width derived from the joined entity types.
        expected: usize,
        /// Width of the row.
        actual: usize,
    },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
