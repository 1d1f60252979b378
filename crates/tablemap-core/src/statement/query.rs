//! Select query descriptions.

use std::fmt;
use std::marker::PhantomData;

use super::join::Join;
use super::Page;
use crate::predicate::{Col, ColumnRef, Predicate};
use crate::schema::Entity;

/// Order direction for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    Asc,
    /// Descending order (DESC)
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

/// An ordering specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to order by
    pub column: ColumnRef,
    /// Order direction
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Parses an order specification for entity `E`.
    ///
    /// Prefix with `-` for descending order.
    /// Example: `"-created_at"` for descending, `"name"` for ascending.
    #[must_use]
    pub fn parse<E: Entity>(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(column) => Col::<E>::new(column.to_string()).desc(),
            None => Col::<E>::new(spec.to_string()).asc(),
        }
    }
}

impl<E: Entity> Col<E> {
    /// Orders by this column ascending.
    #[must_use]
    pub fn asc(self) -> OrderBy {
        OrderBy {
            column: self.to_ref(),
            direction: OrderDirection::Asc,
        }
    }

    /// Orders by this column descending.
    #[must_use]
    pub fn desc(self) -> OrderBy {
        OrderBy {
            column: self.to_ref(),
            direction: OrderDirection::Desc,
        }
    }
}

/// A chainable description of a select over entity `E`.
///
/// # Example
///
/// ```ignore
/// let query = Query::<Blog>::new()
///     .filter(Blog::rating().gte(3))
///     .exclude(Blog::title().starts_with("Draft"))
///     .order_by("-rating")
///     .page(2, 10);
/// ```
#[derive(Debug)]
pub struct Query<E> {
    /// Filter predicates (combined with AND)
    filters: Vec<Predicate>,
    /// Ordering specifications
    order_by: Vec<OrderBy>,
    /// Joins in declaration order
    joins: Vec<Join>,
    /// Requested page
    page: Option<Page>,
    _marker: PhantomData<fn() -> E>,
}

// Manual Clone implementation to avoid E: Clone bound
impl<E> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            order_by: self.order_by.clone(),
            joins: self.joins.clone(),
            page: self.page,
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> Default for Query<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Query<E> {
    /// Creates a query selecting every row of `E`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            order_by: Vec::new(),
            joins: Vec::new(),
            page: None,
            _marker: PhantomData,
        }
    }

    /// Adds a filter. Multiple filters are combined with AND.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Adds a negated filter: rows matching the predicate are excluded.
    #[must_use]
    pub fn exclude(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate.not());
        self
    }

    /// Adds ordering on a column of `E`. Use `-` prefix for descending order.
    #[must_use]
    pub fn order_by(mut self, spec: &str) -> Self {
        self.order_by.push(OrderBy::parse::<E>(spec));
        self
    }

    /// Adds ordering on any column in scope, including joined entities.
    #[must_use]
    pub fn order(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Adds a join. Joins are rendered in the order they are added.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Requests one page of results.
    #[must_use]
    pub fn page(mut self, number: u64, size: u64) -> Self {
        self.page = Some(Page::new(number, size));
        self
    }

    /// Removes any page request.
    #[must_use]
    pub fn unpaged(mut self) -> Self {
        self.page = None;
        self
    }

    /// Returns the filter predicates.
    #[must_use]
    pub fn filters(&self) -> &[Predicate] {
        &self.filters
    }

    /// Returns the ordering.
    #[must_use]
    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    /// Returns the joins.
    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Returns the requested page.
    #[must_use]
    pub const fn paging(&self) -> Option<Page> {
        self.page
    }
}
