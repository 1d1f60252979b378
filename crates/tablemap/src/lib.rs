//! # tablemap
//!
//! Typed table mapping on top of a connection provider.
//!
//! This crate provides:
//! - [`Session`] for inserts, updates, deletes, lookups, queries, paging
//!   and nested (joined) loads of `#[derive(Entity)]` types
//! - [`Executor`] for ordered statement batches with veto and rollback
//! - Scoped transactions that roll back unless committed
//! - [`SqliteProvider`], a rusqlite-backed [`ConnectionProvider`]
//! - [`MapperConfig`] loaded from JSON
//!
//! ## Quick Start
//!
//! ```ignore
//! use tablemap::{MapperConfig, Query, Session, SqliteProvider};
//! use tablemap_derive::Entity;
//!
//! #[derive(Debug, Default, Clone, Entity)]
//! #[entity(table = "users")]
//! struct User {
//!     #[column(identity)]
//!     id: i64,
//!     username: String,
//!     is_active: bool,
//! }
//!
//! fn example(session: &Session<SqliteProvider>) -> tablemap::Result<()> {
//!     let mut user = User { username: "alice".into(), is_active: true, ..User::default() };
//!     session.insert(&mut user)?;
//!
//!     let active = session.select(
//!         &Query::<User>::new()
//!             .filter(User::is_active().eq(true))
//!             .order_by("-id"),
//!     )?;
//!
//!     let same: User = session.get(user.id)?;
//!     let count = session.count(&Query::<User>::new())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Batches and Transactions
//!
//! ```ignore
//! use tablemap::{BatchStep, IsolationLevel};
//!
//! let generator = session.generator();
//! let outcome = session.batch(
//!     vec![
//!         BatchStep::discard(generator.insert(&order)?),
//!         BatchStep::new(generator.update_where::<Stock>(&patch, &filter)?, |result| {
//!             // Stop and roll back if no stock row was touched.
//!             Ok(result.affected() == Some(1))
//!         }),
//!     ],
//!     Some(IsolationLevel::Serializable),
//! )?;
//!
//! session.transaction(IsolationLevel::ReadCommitted, |tx| {
//!     tx.insert(&mut invoice)?;
//!     tx.delete_where::<Draft>(&Draft::invoice_id().eq(invoice.id))?;
//!     Ok(())
//! })?;
//! ```

mod config;
mod error;
pub mod executor;
mod operations;
mod provider;
mod session;
mod sqlite;
mod transaction;

pub use config::{DialectKind, MapperConfig};
pub use error::{OrmError, Result};
pub use executor::{BatchOutcome, BatchStep, Executor, StatementResult};
pub use operations::PageResult;
pub use provider::{Connection, ConnectionProvider, IsolationLevel};
pub use session::Session;
pub use sqlite::{SqliteConnection, SqliteProvider};
pub use transaction::{Transaction, TransactionGuard};

// Re-export commonly used types from tablemap-core
pub use tablemap_core::{
    Col, Dialect, Entity, EntityRegistry, Join, JoinKind, NestedHydrator, OrderBy,
    OrderDirection, Page, Patch, Predicate, Query, ResultSet, SqlStatement, SqlValue,
    StatementGenerator, StatementKind, ToSqlValue,
};
