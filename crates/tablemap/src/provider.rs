//! The boundary between the mapper and a database driver.
//!
//! A [`ConnectionProvider`] opens [`Connection`]s; a connection executes
//! [`SqlStatement`]s with one of three calling conventions and controls
//! transactions. Parameters travel with each statement and are bound by
//! name.

use std::fmt;

use serde::{Deserialize, Serialize};
use tablemap_core::{ResultSet, SqlStatement, SqlValue};

use crate::error::Result;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Dirty reads allowed.
    ReadUncommitted,
    /// Only committed data is read.
    ReadCommitted,
    /// Rows read once read the same again.
    RepeatableRead,
    /// Full serializability.
    #[default]
    Serializable,
    /// Statement-consistent snapshot.
    Snapshot,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ReadUncommitted => "read uncommitted",
            Self::ReadCommitted => "read committed",
            Self::RepeatableRead => "repeatable read",
            Self::Serializable => "serializable",
            Self::Snapshot => "snapshot",
        };
        f.write_str(s)
    }
}

/// An open database connection.
pub trait Connection {
    /// Executes a statement and returns the first column of its first row,
    /// or NULL when it yields no rows.
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    fn execute_scalar(&mut self, statement: &SqlStatement) -> Result<SqlValue>;

    /// Executes a statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    fn execute_non_query(&mut self, statement: &SqlStatement) -> Result<u64>;

    /// Executes a command and materializes every result set it yields, in
    /// order. Commands made of several `;`-separated statements yield one
    /// result set per row-returning statement.
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    fn execute_reader(&mut self, statement: &SqlStatement) -> Result<Vec<ResultSet>>;

    /// Begins a transaction.
    ///
    /// # Errors
    ///
    /// Returns the driver's error, e.g. when a transaction is already open.
    fn begin(&mut self, isolation: IsolationLevel) -> Result<()>;

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    fn commit(&mut self) -> Result<()>;

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    fn rollback(&mut self) -> Result<()>;
}

/// Opens connections to one database.
pub trait ConnectionProvider: Send + Sync {
    /// Connection type produced by this provider.
    type Connection: Connection + 'static;

    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// Returns the driver's error if the database cannot be opened.
    fn open(&self) -> Result<Self::Connection>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_serde_names() {
        let json = serde_json::to_string(&IsolationLevel::RepeatableRead).unwrap();
        assert_eq!(json, "\"repeatable_read\"");
        let level: IsolationLevel = serde_json::from_str("\"read_committed\"").unwrap();
        assert_eq!(level, IsolationLevel::ReadCommitted);
        assert_eq!(IsolationLevel::default(), IsolationLevel::Serializable);
    }
}
