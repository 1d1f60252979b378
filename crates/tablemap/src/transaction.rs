//! Transaction scoping.
//!
//! [`TransactionGuard`] owns an open transaction on a borrowed connection
//! and rolls it back when dropped without a commit, so early returns, `?`
//! and panics all release it. [`Transaction`] is the typed handle passed to
//! [`crate::Session::transaction`] callbacks.

use tablemap_core::{Entity, NestedHydrator, Patch, Predicate, Query, SqlStatement, ToSqlValue};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::executor::{execute, StatementResult};
use crate::operations::{Operations, PageResult};
use crate::provider::{Connection, IsolationLevel};

/// An open transaction, rolled back on drop unless committed.
pub struct TransactionGuard<'c, C: Connection> {
    conn: &'c mut C,
    isolation: IsolationLevel,
    finished: bool,
}

impl<'c, C: Connection> TransactionGuard<'c, C> {
    /// Begins a transaction on `conn`.
    ///
    /// # Errors
    ///
    /// Returns the connection's error if the transaction cannot begin.
    pub fn begin(conn: &'c mut C, isolation: IsolationLevel) -> Result<Self> {
        conn.begin(isolation)?;
        debug!(%isolation, "Transaction started");
        Ok(Self {
            conn,
            isolation,
            finished: false,
        })
    }

    /// Returns the connection the transaction runs on.
    pub fn connection(&mut self) -> &mut C {
        self.conn
    }

    /// Returns the isolation level.
    #[must_use]
    pub const fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns the connection's error; the transaction is then rolled back
    /// on drop.
    pub fn commit(mut self) -> Result<()> {
        self.conn.commit()?;
        self.finished = true;
        info!(isolation = %self.isolation, "Transaction committed");
        Ok(())
    }

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Returns the connection's error.
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.rollback()?;
        info!(isolation = %self.isolation, "Transaction rolled back");
        Ok(())
    }
}

impl<C: Connection> Drop for TransactionGuard<'_, C> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.conn.rollback() {
            Ok(()) => info!(isolation = %self.isolation, "Transaction rolled back on drop"),
            Err(e) => warn!(error = %e, "Rollback on drop failed"),
        }
    }
}

/// Typed operations inside one transaction.
///
/// Every call runs on the transaction's connection. The transaction commits
/// when the callback passed to [`crate::Session::transaction`] returns `Ok`
/// and rolls back otherwise.
pub struct Transaction<'s, 'c, C: Connection> {
    guard: TransactionGuard<'c, C>,
    ops: Operations<'s>,
}

impl<'s, 'c, C: Connection> Transaction<'s, 'c, C> {
    pub(crate) fn new(guard: TransactionGuard<'c, C>, ops: Operations<'s>) -> Self {
        Self { guard, ops }
    }

    pub(crate) fn into_guard(self) -> TransactionGuard<'c, C> {
        self.guard
    }

    /// Inserts an entity and stores the generated identity on it.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::insert`].
    pub fn insert<E: Entity>(&mut self, entity: &mut E) -> Result<()> {
        self.ops.insert(self.guard.connection(), entity)
    }

    /// Updates every column of an entity by key.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::update`].
    pub fn update<E: Entity>(&mut self, entity: &E) -> Result<u64> {
        self.ops.update(self.guard.connection(), entity)
    }

    /// Updates the patched columns of every matching row.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::update_where`].
    pub fn update_where<E: Entity>(&mut self, patch: &Patch, predicate: &Predicate) -> Result<u64> {
        self.ops
            .update_where::<E, _>(self.guard.connection(), patch, predicate)
    }

    /// Deletes an entity by key.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::delete`].
    pub fn delete<E: Entity>(&mut self, entity: &E) -> Result<u64> {
        self.ops.delete(self.guard.connection(), entity)
    }

    /// Deletes every matching row.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::delete_where`].
    pub fn delete_where<E: Entity>(&mut self, predicate: &Predicate) -> Result<u64> {
        self.ops.delete_where::<E, _>(self.guard.connection(), predicate)
    }

    /// Loads one entity by key.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::get`].
    pub fn get<E: Entity>(&mut self, key: impl ToSqlValue) -> Result<E> {
        self.ops.get(self.guard.connection(), key.to_sql_value())
    }

    /// Loads one entity by key, or `None`.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::get_or_none`].
    pub fn get_or_none<E: Entity>(&mut self, key: impl ToSqlValue) -> Result<Option<E>> {
        self.ops.get_or_none(self.guard.connection(), key.to_sql_value())
    }

    /// Runs a query.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::select`].
    pub fn select<E: Entity>(&mut self, query: &Query<E>) -> Result<Vec<E>> {
        self.ops.select(self.guard.connection(), query)
    }

    /// Returns the first result of a query.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::first`].
    pub fn first<E: Entity>(&mut self, query: &Query<E>) -> Result<Option<E>> {
        self.ops.first(self.guard.connection(), query)
    }

    /// Counts the rows (or distinct roots) a query matches.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::count`].
    pub fn count<E: Entity>(&mut self, query: &Query<E>) -> Result<u64> {
        self.ops.count(self.guard.connection(), query)
    }

    /// Runs a paged query with its total count.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::select_page`].
    pub fn select_page<E: Entity>(&mut self, query: &Query<E>) -> Result<PageResult<E>> {
        self.ops.select_page(self.guard.connection(), query)
    }

    /// Runs a join query and rebuilds the object graph.
    ///
    /// # Errors
    ///
    /// See [`crate::Session::select_nested`].
    pub fn select_nested<R: Entity>(
        &mut self,
        query: &Query<R>,
        hydrator: &NestedHydrator<R>,
    ) -> Result<Vec<R>> {
        self.ops
            .select_nested(self.guard.connection(), query, hydrator)
    }

    /// Executes a raw statement.
    ///
    /// # Errors
    ///
    /// Returns the connection's error.
    pub fn execute(&mut self, statement: &SqlStatement) -> Result<StatementResult> {
        execute(self.guard.connection(), statement)
    }
}
