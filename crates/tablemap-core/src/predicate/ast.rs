//! Predicate expressions over typed entity columns.
//!
//! Predicates are built from [`Col`] handles, usually the accessors generated
//! by `#[derive(Entity)]`, and combined with [`Predicate::and`],
//! [`Predicate::or`] and [`Predicate::not`].
//!
//! # Example
//!
//! ```ignore
//! let filter = Blog::title().eq("Rust")
//!     .and(Blog::rating().gt(3).or(Blog::pinned().eq(true)));
//!
//! let filter = Blog::id().is_in([1, 2, 3]).not();
//! ```

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::schema::{Entity, EntityKey};
use crate::value::{SqlValue, ToSqlValue};

/// A boolean predicate over one or more entity types.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Binary comparison: left op right.
    Comparison {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// Membership test: column IN (values).
    Membership { column: Operand, values: Operand },
    /// Pattern test: column LIKE pattern.
    Pattern {
        column: Operand,
        kind: PatternKind,
        value: Operand,
    },
    /// AND combination.
    And(Box<Predicate>, Box<Predicate>),
    /// OR combination.
    Or(Box<Predicate>, Box<Predicate>),
    /// NOT negation.
    Not(Box<Predicate>),
    /// A constant truth value.
    Literal(bool),
}

impl Predicate {
    /// A predicate that always holds.
    #[must_use]
    pub const fn always() -> Self {
        Self::Literal(true)
    }

    /// A predicate that never holds.
    #[must_use]
    pub const fn never() -> Self {
        Self::Literal(false)
    }

    /// Combines with another predicate using AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Combines with another predicate using OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Negates this predicate.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Builds a comparison between two arbitrary operands.
    #[must_use]
    pub fn compare(left: Operand, op: CompareOp, right: Operand) -> Self {
        Self::Comparison { left, op, right }
    }

    /// Combines predicates with AND. An empty iterator yields
    /// [`Predicate::always`].
    pub fn all(predicates: impl IntoIterator<Item = Self>) -> Self {
        predicates
            .into_iter()
            .reduce(Self::and)
            .unwrap_or_else(Self::always)
    }

    /// Combines predicates with OR. An empty iterator yields
    /// [`Predicate::never`].
    pub fn any(predicates: impl IntoIterator<Item = Self>) -> Self {
        predicates
            .into_iter()
            .reduce(Self::or)
            .unwrap_or_else(Self::never)
    }
}

/// One side of a comparison.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A column of a bound entity.
    Column(ColumnRef),
    /// A constant value.
    Literal(SqlValue),
    /// A constant list, for membership tests.
    List(Vec<SqlValue>),
    /// A value computed when the predicate is compiled.
    Computed(Computed),
}

impl Operand {
    /// Creates a literal operand.
    pub fn literal<V: ToSqlValue>(value: V) -> Self {
        Self::Literal(value.to_sql_value())
    }

    /// Creates a list operand.
    pub fn list<V: ToSqlValue>(values: impl IntoIterator<Item = V>) -> Self {
        Self::List(values.into_iter().map(ToSqlValue::to_sql_value).collect())
    }

    /// Creates an operand evaluated at compile time.
    pub fn computed(f: impl Fn() -> Self + Send + Sync + 'static) -> Self {
        Self::Computed(Computed(Arc::new(f)))
    }
}

impl<E: Entity> From<Col<E>> for Operand {
    fn from(col: Col<E>) -> Self {
        Self::Column(col.to_ref())
    }
}

/// A deferred operand, evaluated once per compilation.
#[derive(Clone)]
pub struct Computed(Arc<dyn Fn() -> Operand + Send + Sync>);

impl Computed {
    /// Evaluates the operand.
    #[must_use]
    pub fn evaluate(&self) -> Operand {
        (self.0)()
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Computed(..)")
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
}

impl CompareOp {
    /// Returns the operator that holds when the operands are swapped.
    #[must_use]
    pub const fn mirror(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Lt => Self::Gt,
            Self::Lte => Self::Gte,
            Self::Gt => Self::Lt,
            Self::Gte => Self::Lte,
        }
    }

    /// Returns whether the operator holds for an ordering of left to right.
    #[must_use]
    pub const fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => matches!(ordering, Ordering::Equal),
            Self::Ne => !matches!(ordering, Ordering::Equal),
            Self::Lt => matches!(ordering, Ordering::Less),
            Self::Lte => !matches!(ordering, Ordering::Greater),
            Self::Gt => matches!(ordering, Ordering::Greater),
            Self::Gte => !matches!(ordering, Ordering::Less),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
        }
    }
}

/// Kind of string pattern test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Substring match.
    Contains,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
}

impl PatternKind {
    /// Builds the LIKE pattern for a search string.
    #[must_use]
    pub fn like_pattern(self, text: &str) -> String {
        match self {
            Self::Contains => format!("%{text}%"),
            Self::StartsWith => format!("{text}%"),
            Self::EndsWith => format!("%{text}"),
        }
    }

    /// Evaluates the test on two constants.
    #[must_use]
    pub fn matches(self, subject: &str, text: &str) -> bool {
        match self {
            Self::Contains => subject.contains(text),
            Self::StartsWith => subject.starts_with(text),
            Self::EndsWith => subject.ends_with(text),
        }
    }
}

/// A type-erased reference to a column of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Owning entity.
    pub entity: EntityKey,
    /// Column name.
    pub column: Cow<'static, str>,
    /// Which alias of the entity to use in a join, 1-based. `None` means the
    /// first.
    pub occurrence: Option<usize>,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.column)?;
        if let Some(n) = self.occurrence {
            write!(f, "#{n}")?;
        }
        Ok(())
    }
}

/// A typed column handle for entity `E`.
pub struct Col<E> {
    name: Cow<'static, str>,
    occurrence: Option<usize>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Col<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            occurrence: self.occurrence,
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Col<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Col")
            .field("name", &self.name)
            .field("occurrence", &self.occurrence)
            .finish()
    }
}

impl<E: Entity> Col<E> {
    /// Creates a column handle.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            occurrence: None,
            _entity: PhantomData,
        }
    }

    /// Refers to the n-th (1-based) join alias of `E` rather than the first.
    #[must_use]
    pub fn nth(mut self, occurrence: usize) -> Self {
        self.occurrence = Some(occurrence);
        self
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the type-erased column reference.
    #[must_use]
    pub fn to_ref(&self) -> ColumnRef {
        ColumnRef {
            entity: EntityKey::of::<E>(),
            column: self.name.clone(),
            occurrence: self.occurrence,
        }
    }

    fn compare_value(self, op: CompareOp, value: SqlValue) -> Predicate {
        Predicate::Comparison {
            left: self.into(),
            op,
            right: Operand::Literal(value),
        }
    }

    fn compare_column<F: Entity>(self, op: CompareOp, other: Col<F>) -> Predicate {
        Predicate::Comparison {
            left: self.into(),
            op,
            right: other.into(),
        }
    }

    /// column = value
    pub fn eq<V: ToSqlValue>(self, value: V) -> Predicate {
        self.compare_value(CompareOp::Eq, value.to_sql_value())
    }

    /// column != value
    pub fn ne<V: ToSqlValue>(self, value: V) -> Predicate {
        self.compare_value(CompareOp::Ne, value.to_sql_value())
    }

    /// column < value
    pub fn lt<V: ToSqlValue>(self, value: V) -> Predicate {
        self.compare_value(CompareOp::Lt, value.to_sql_value())
    }

    /// column <= value
    pub fn lte<V: ToSqlValue>(self, value: V) -> Predicate {
        self.compare_value(CompareOp::Lte, value.to_sql_value())
    }

    /// column > value
    pub fn gt<V: ToSqlValue>(self, value: V) -> Predicate {
        self.compare_value(CompareOp::Gt, value.to_sql_value())
    }

    /// column >= value
    pub fn gte<V: ToSqlValue>(self, value: V) -> Predicate {
        self.compare_value(CompareOp::Gte, value.to_sql_value())
    }

    /// column = other column
    pub fn eq_col<F: Entity>(self, other: Col<F>) -> Predicate {
        self.compare_column(CompareOp::Eq, other)
    }

    /// column != other column
    pub fn ne_col<F: Entity>(self, other: Col<F>) -> Predicate {
        self.compare_column(CompareOp::Ne, other)
    }

    /// column < other column
    pub fn lt_col<F: Entity>(self, other: Col<F>) -> Predicate {
        self.compare_column(CompareOp::Lt, other)
    }

    /// column <= other column
    pub fn lte_col<F: Entity>(self, other: Col<F>) -> Predicate {
        self.compare_column(CompareOp::Lte, other)
    }

    /// column > other column
    pub fn gt_col<F: Entity>(self, other: Col<F>) -> Predicate {
        self.compare_column(CompareOp::Gt, other)
    }

    /// column >= other column
    pub fn gte_col<F: Entity>(self, other: Col<F>) -> Predicate {
        self.compare_column(CompareOp::Gte, other)
    }

    /// Compares against a value produced when the predicate is compiled.
    pub fn compare_with(
        self,
        op: CompareOp,
        f: impl Fn() -> SqlValue + Send + Sync + 'static,
    ) -> Predicate {
        Predicate::Comparison {
            left: self.into(),
            op,
            right: Operand::computed(move || Operand::Literal(f())),
        }
    }

    /// column IS NULL
    pub fn is_null(self) -> Predicate {
        self.compare_value(CompareOp::Eq, SqlValue::Null)
    }

    /// column IS NOT NULL
    pub fn is_not_null(self) -> Predicate {
        self.compare_value(CompareOp::Ne, SqlValue::Null)
    }

    /// column IN (values)
    pub fn is_in<V: ToSqlValue>(self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::Membership {
            column: self.into(),
            values: Operand::list(values),
        }
    }

    /// column NOT IN (values)
    pub fn not_in<V: ToSqlValue>(self, values: impl IntoIterator<Item = V>) -> Predicate {
        self.is_in(values).not()
    }

    /// column LIKE '%text%'
    pub fn contains(self, text: impl Into<String>) -> Predicate {
        self.pattern(PatternKind::Contains, text.into())
    }

    /// column LIKE 'text%'
    pub fn starts_with(self, text: impl Into<String>) -> Predicate {
        self.pattern(PatternKind::StartsWith, text.into())
    }

    /// column LIKE '%text'
    pub fn ends_with(self, text: impl Into<String>) -> Predicate {
        self.pattern(PatternKind::EndsWith, text.into())
    }

    fn pattern(self, kind: PatternKind, text: String) -> Predicate {
        Predicate::Pattern {
            column: self.into(),
            kind,
            value: Operand::Literal(SqlValue::Text(text)),
        }
    }
}
