//! The session: typed access to one database.
//!
//! A [`Session`] owns a connection provider, a dialect and the entity
//! registry. Each operation opens its own connection and auto-commits;
//! [`Session::transaction`] groups operations on one connection.

use std::sync::Arc;

use tablemap_core::{
    Dialect, Entity, EntityRegistry, NestedHydrator, Patch, Predicate, Query, SqlStatement,
    StatementGenerator, ToSqlValue,
};
use tracing::warn;

use crate::config::MapperConfig;
use crate::error::Result;
use crate::executor::{execute, BatchOutcome, BatchStep, Executor, StatementResult};
use crate::operations::{Operations, PageResult};
use crate::provider::{ConnectionProvider, IsolationLevel};
use crate::transaction::{Transaction, TransactionGuard};

/// Typed access to the database behind a provider.
///
/// # Example
///
/// ```ignore
/// let session = Session::new(SqliteProvider::file("app.db"), MapperConfig::default());
///
/// let mut blog = Blog { title: "Rust".into(), ..Blog::default() };
/// session.insert(&mut blog)?;
///
/// let found: Blog = session.get(blog.id)?;
/// let popular = session.select(&Query::<Blog>::new().filter(Blog::rating().gte(4)))?;
/// ```
pub struct Session<P: ConnectionProvider> {
    provider: P,
    registry: Arc<EntityRegistry>,
    dialect: Box<dyn Dialect>,
    config: MapperConfig,
}

impl<P: ConnectionProvider> Session<P> {
    /// Creates a session with a fresh registry built from `config`.
    #[must_use]
    pub fn new(provider: P, config: MapperConfig) -> Self {
        let registry = Arc::new(EntityRegistry::new(config.naming()));
        Self::with_registry(provider, config, registry)
    }

    /// Creates a session sharing an existing registry. The registry's table
    /// naming takes precedence over `config`.
    #[must_use]
    pub fn with_registry(provider: P, config: MapperConfig, registry: Arc<EntityRegistry>) -> Self {
        Self {
            dialect: config.dialect.dialect(),
            provider,
            registry,
            config,
        }
    }

    /// Returns the provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the entity registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Returns a statement generator for this session's registry and dialect.
    #[must_use]
    pub fn generator(&self) -> StatementGenerator<'_> {
        StatementGenerator::new(&self.registry, self.dialect.as_ref())
    }

    fn ops(&self) -> Operations<'_> {
        Operations::new(&self.registry, self.dialect.as_ref())
    }

    /// Inserts an entity and stores the generated identity on it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OrmError::UnexpectedResult`] if the database returns
    /// no identity, and generation or database errors.
    pub fn insert<E: Entity>(&self, entity: &mut E) -> Result<()> {
        let mut conn = self.provider.open()?;
        self.ops().insert(&mut conn, entity)
    }

    /// Updates every column of an entity by key, returning the number of
    /// rows changed.
    ///
    /// # Errors
    ///
    /// Returns generation or database errors.
    pub fn update<E: Entity>(&self, entity: &E) -> Result<u64> {
        let mut conn = self.provider.open()?;
        self.ops().update(&mut conn, entity)
    }

    /// Updates the patched columns of every row matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns generation or database errors.
    pub fn update_where<E: Entity>(&self, patch: &Patch, predicate: &Predicate) -> Result<u64> {
        let mut conn = self.provider.open()?;
        self.ops().update_where::<E, _>(&mut conn, patch, predicate)
    }

    /// Deletes an entity by key.
    ///
    /// # Errors
    ///
    /// Returns generation or database errors.
    pub fn delete<E: Entity>(&self, entity: &E) -> Result<u64> {
        let mut conn = self.provider.open()?;
        self.ops().delete(&mut conn, entity)
    }

    /// Deletes every row matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns generation or database errors.
    pub fn delete_where<E: Entity>(&self, predicate: &Predicate) -> Result<u64> {
        let mut conn = self.provider.open()?;
        self.ops().delete_where::<E, _>(&mut conn, predicate)
    }

    /// Loads the entity whose identity equals `key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OrmError::NotFound`] if no row matches and
    /// [`crate::OrmError::MultipleObjectsReturned`] if several do.
    pub fn get<E: Entity>(&self, key: impl ToSqlValue) -> Result<E> {
        let mut conn = self.provider.open()?;
        self.ops().get(&mut conn, key.to_sql_value())
    }

    /// Loads the entity whose identity equals `key`, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OrmError::MultipleObjectsReturned`] if several rows
    /// match.
    pub fn get_or_none<E: Entity>(&self, key: impl ToSqlValue) -> Result<Option<E>> {
        let mut conn = self.provider.open()?;
        self.ops().get_or_none(&mut conn, key.to_sql_value())
    }

    /// Runs a query. Join queries return each root once, in row order.
    ///
    /// # Errors
    ///
    /// Returns generation, database or conversion errors.
    pub fn select<E: Entity>(&self, query: &Query<E>) -> Result<Vec<E>> {
        let mut conn = self.provider.open()?;
        self.ops().select(&mut conn, query)
    }

    /// Returns the first result of a query. Queries without an ordering are
    /// ordered by identity.
    ///
    /// # Errors
    ///
    /// Returns generation, database or conversion errors.
    pub fn first<E: Entity>(&self, query: &Query<E>) -> Result<Option<E>> {
        let mut conn = self.provider.open()?;
        self.ops().first(&mut conn, query)
    }

    /// Counts the rows a query matches, or its distinct roots for joins.
    ///
    /// # Errors
    ///
    /// Returns generation or database errors.
    pub fn count<E: Entity>(&self, query: &Query<E>) -> Result<u64> {
        let mut conn = self.provider.open()?;
        self.ops().count(&mut conn, query)
    }

    /// Runs a query's page and its unpaged count in one round trip.
    ///
    /// # Errors
    ///
    /// Returns generation, database or conversion errors.
    pub fn select_page<E: Entity>(&self, query: &Query<E>) -> Result<PageResult<E>> {
        let mut conn = self.provider.open()?;
        self.ops().select_page(&mut conn, query)
    }

    /// Runs a join query and rebuilds roots with their joined children.
    ///
    /// The hydrator's slots must follow the query's joins in order.
    ///
    /// # Errors
    ///
    /// Returns generation, database or hydration errors.
    pub fn select_nested<R: Entity>(
        &self,
        query: &Query<R>,
        hydrator: &NestedHydrator<R>,
    ) -> Result<Vec<R>> {
        let mut conn = self.provider.open()?;
        self.ops().select_nested(&mut conn, query, hydrator)
    }

    /// Executes one raw statement, e.g. a stored procedure call.
    ///
    /// # Errors
    ///
    /// Returns database errors.
    pub fn execute(&self, statement: &SqlStatement) -> Result<StatementResult> {
        let mut conn = self.provider.open()?;
        execute(&mut conn, statement)
    }

    /// Runs a batch of statements. See [`Executor::run`].
    ///
    /// # Errors
    ///
    /// See [`Executor::run`].
    pub fn batch(
        &self,
        steps: Vec<BatchStep<'_>>,
        isolation: Option<IsolationLevel>,
    ) -> Result<BatchOutcome> {
        Executor::new(&self.provider).run(steps, isolation)
    }

    /// Runs `f` inside a transaction, committing if it returns `Ok` and
    /// rolling back otherwise.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or the database error of begin or commit.
    pub fn transaction<T, F>(&self, isolation: IsolationLevel, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_, '_, P::Connection>) -> Result<T>,
    {
        let mut conn = self.provider.open()?;
        let guard = TransactionGuard::begin(&mut conn, isolation)?;
        let mut tx = Transaction::new(guard, self.ops());
        match f(&mut tx) {
            Ok(value) => {
                tx.into_guard().commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.into_guard().rollback() {
                    warn!(error = %rollback, "Rollback after failed transaction failed");
                }
                Err(e)
            }
        }
    }

    /// Runs `f` inside a transaction at the configured isolation level.
    ///
    /// # Errors
    ///
    /// See [`Session::transaction`].
    pub fn transaction_default<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_, '_, P::Connection>) -> Result<T>,
    {
        self.transaction(self.config.isolation, f)
    }
}
