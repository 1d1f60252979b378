//! Error types for sessions and execution.

use thiserror::Error;

/// Errors raised while generating, executing or hydrating statements.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Statement generation or hydration failed.
    #[error(transparent)]
    Core(#[from] tablemap_core::Error),

    /// Database error from the SQLite provider.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Error reported by a provider without a typed error.
    #[error("provider error: {0}")]
    Provider(String),

    /// No object found matching the query.
    #[error("object not found")]
    NotFound,

    /// Multiple objects found when exactly one was expected.
    #[error("multiple objects returned when one was expected")]
    MultipleObjectsReturned,

    /// The database returned something the calling convention does not
    /// expect, e.g. no generated key after an insert.
    #[error("unexpected result: {0}")]
    UnexpectedResult(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error (reading configuration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for mapper operations.
pub type Result<T> = std::result::Result<T, OrmError>;
