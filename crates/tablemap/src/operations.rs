//! Typed operations shared by sessions and transactions.
//!
//! Each operation generates one statement, executes it on a connection
//! chosen by the caller and converts the result.

use tablemap_core::{
    Col, Dialect, Entity, EntityRegistry, Hydrator, NestedHydrator, Page, Patch, Predicate, Query,
    ResultSet, SqlStatement, SqlValue, StatementGenerator,
};

use crate::error::{OrmError, Result};
use crate::executor::{execute, StatementResult};
use crate::provider::Connection;

/// One page of a query and the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<E> {
    /// Entities on this page.
    pub items: Vec<E>,
    /// Matches across all pages.
    pub total: u64,
    /// The page requested, if any.
    pub page: Option<Page>,
}

impl<E> PageResult<E> {
    /// Returns the number of pages, or 1 for an unpaged query.
    #[must_use]
    pub fn page_count(&self) -> u64 {
        match self.page {
            Some(page) if page.size > 0 => self.total.div_ceil(page.size),
            _ => 1,
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct Operations<'s> {
    registry: &'s EntityRegistry,
    dialect: &'s dyn Dialect,
}

impl<'s> Operations<'s> {
    pub(crate) const fn new(registry: &'s EntityRegistry, dialect: &'s dyn Dialect) -> Self {
        Self { registry, dialect }
    }

    fn generator(&self) -> StatementGenerator<'s> {
        StatementGenerator::new(self.registry, self.dialect)
    }

    fn hydrator(&self) -> Hydrator<'s> {
        Hydrator::new(self.registry)
    }

    pub(crate) fn insert<E, C>(&self, conn: &mut C, entity: &mut E) -> Result<()>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        let statement = self.generator().insert(entity)?;
        let key = scalar(execute(conn, &statement)?)?;
        if key.is_null() {
            return Err(OrmError::UnexpectedResult(format!(
                "insert into {} returned no identity",
                E::TABLE
            )));
        }
        let map = self.registry.entity::<E>();
        map.assign(entity, map.identity_position()?, key)?;
        Ok(())
    }

    pub(crate) fn update<E, C>(&self, conn: &mut C, entity: &E) -> Result<u64>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        let statement = self.generator().update(entity)?;
        affected(execute(conn, &statement)?)
    }

    pub(crate) fn update_where<E, C>(
        &self,
        conn: &mut C,
        patch: &Patch,
        predicate: &Predicate,
    ) -> Result<u64>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        let statement = self.generator().update_where::<E>(patch, predicate)?;
        affected(execute(conn, &statement)?)
    }

    pub(crate) fn delete<E, C>(&self, conn: &mut C, entity: &E) -> Result<u64>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        let statement = self.generator().delete(entity)?;
        affected(execute(conn, &statement)?)
    }

    pub(crate) fn delete_where<E, C>(&self, conn: &mut C, predicate: &Predicate) -> Result<u64>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        let statement = self.generator().delete_where::<E>(predicate)?;
        affected(execute(conn, &statement)?)
    }

    pub(crate) fn get_or_none<E, C>(&self, conn: &mut C, key: SqlValue) -> Result<Option<E>>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        let statement = self.generator().select_by_key::<E>(key)?;
        let mut found = self.load::<E, C>(conn, &statement, false)?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            _ => Err(OrmError::MultipleObjectsReturned),
        }
    }

    pub(crate) fn get<E, C>(&self, conn: &mut C, key: SqlValue) -> Result<E>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        self.get_or_none(conn, key)?.ok_or(OrmError::NotFound)
    }

    pub(crate) fn select<E, C>(&self, conn: &mut C, query: &Query<E>) -> Result<Vec<E>>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        let statement = self.generator().select(query)?;
        self.load(conn, &statement, !query.joins().is_empty())
    }

    pub(crate) fn first<E, C>(&self, conn: &mut C, query: &Query<E>) -> Result<Option<E>>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        let mut query = query.clone();
        if query.ordering().is_empty() {
            match self.registry.shape::<E>().identity_column() {
                Ok(key) => query = query.order(Col::<E>::new(key).asc()),
                // Without a key or an ordering there is nothing to page on.
                Err(_) => return Ok(self.select(conn, &query.unpaged())?.into_iter().next()),
            }
        }
        let found = self.select(conn, &query.page(1, 1))?;
        Ok(found.into_iter().next())
    }

    pub(crate) fn count<E, C>(&self, conn: &mut C, query: &Query<E>) -> Result<u64>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        let statement = self.generator().count(query)?;
        count_value(&scalar(execute(conn, &statement)?)?)
    }

    pub(crate) fn select_page<E, C>(&self, conn: &mut C, query: &Query<E>) -> Result<PageResult<E>>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        let statement = self.generator().select_with_count(query)?;
        let sets = rows(execute(conn, &statement)?)?;
        let [items, total]: [ResultSet; 2] = sets.try_into().map_err(|sets: Vec<ResultSet>| {
            OrmError::UnexpectedResult(format!(
                "expected a page and a count, got {} result sets",
                sets.len()
            ))
        })?;
        let total = total
            .scalar()
            .ok_or_else(|| OrmError::UnexpectedResult("count returned no rows".to_string()))?;
        Ok(PageResult {
            items: self.hydrate(&items, !query.joins().is_empty())?,
            total: count_value(total)?,
            page: query.paging(),
        })
    }

    pub(crate) fn select_nested<R, C>(
        &self,
        conn: &mut C,
        query: &Query<R>,
        hydrator: &NestedHydrator<R>,
    ) -> Result<Vec<R>>
    where
        R: Entity,
        C: Connection + ?Sized,
    {
        let statement = self.generator().select(query)?;
        let set = first_set(rows(execute(conn, &statement)?)?);
        Ok(self.hydrator().nested(hydrator, &set)?)
    }

    fn load<E, C>(&self, conn: &mut C, statement: &SqlStatement, joined: bool) -> Result<Vec<E>>
    where
        E: Entity,
        C: Connection + ?Sized,
    {
        let set = first_set(rows(execute(conn, statement)?)?);
        self.hydrate(&set, joined)
    }

    fn hydrate<E: Entity>(&self, set: &ResultSet, joined: bool) -> Result<Vec<E>> {
        let hydrator = self.hydrator();
        let found = if joined {
            hydrator.roots(set)?
        } else {
            hydrator.flat(set)?
        };
        Ok(found)
    }
}

fn scalar(result: StatementResult) -> Result<SqlValue> {
    match result {
        StatementResult::Scalar(value) => Ok(value),
        other => Err(OrmError::UnexpectedResult(format!(
            "expected a scalar, got {other:?}"
        ))),
    }
}

fn affected(result: StatementResult) -> Result<u64> {
    match result {
        StatementResult::Affected(n) => Ok(n),
        other => Err(OrmError::UnexpectedResult(format!(
            "expected a row count, got {other:?}"
        ))),
    }
}

fn rows(result: StatementResult) -> Result<Vec<ResultSet>> {
    match result {
        StatementResult::Rows(sets) => Ok(sets),
        other => Err(OrmError::UnexpectedResult(format!(
            "expected result sets, got {other:?}"
        ))),
    }
}

fn first_set(sets: Vec<ResultSet>) -> ResultSet {
    sets.into_iter().next().unwrap_or_default()
}

fn count_value(value: &SqlValue) -> Result<u64> {
    match value {
        SqlValue::Int(n) => u64::try_from(*n)
            .map_err(|_| OrmError::UnexpectedResult(format!("negative count {n}"))),
        other => Err(OrmError::UnexpectedResult(format!(
            "expected an integer count, got {}",
            other.kind_name()
        ))),
    }
}
