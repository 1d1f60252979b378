//! Predicate to SQL compilation.

use std::cmp::Ordering;

use tracing::trace;

use super::ast::{ColumnRef, CompareOp, Operand, PatternKind, Predicate};
use super::fragment::{
    render, Combinator, CompiledPredicate, Condition, ConditionOperand, Fragment, Parameter,
    ParameterSet, SqlOperator,
};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::schema::EntityKey;
use crate::statement::AliasMap;
use crate::value::SqlValue;

/// Which entity references a compiled predicate may use.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// A single table; columns render unqualified.
    Table(EntityKey),
    /// A join; columns render as `<alias>."<column>"`.
    Aliased(&'a AliasMap),
}

/// Compiles [`Predicate`] trees into fragments and SQL.
pub struct PredicateCompiler<'a> {
    dialect: &'a dyn Dialect,
    scope: Scope<'a>,
}

/// An operand after constant folding.
enum Folded {
    Column(ColumnRef),
    Value(SqlValue),
    List(Vec<SqlValue>),
}

fn fold(operand: &Operand) -> Folded {
    match operand {
        Operand::Column(col) => Folded::Column(col.clone()),
        Operand::Literal(value) => Folded::Value(value.clone()),
        Operand::List(values) => Folded::List(values.clone()),
        Operand::Computed(computed) => fold(&computed.evaluate()),
    }
}

fn constants_equal(a: &SqlValue, b: &SqlValue) -> bool {
    a.compare(b) == Some(Ordering::Equal) || a == b
}

fn fold_comparison(left: &SqlValue, op: CompareOp, right: &SqlValue) -> Result<bool> {
    match op {
        CompareOp::Eq => Ok(constants_equal(left, right)),
        CompareOp::Ne => Ok(!constants_equal(left, right)),
        _ => left
            .compare(right)
            .map(|ordering| op.holds(ordering))
            .ok_or_else(|| {
                Error::UnsupportedExpression(format!(
                    "cannot order {} {op} {}",
                    left.kind_name(),
                    right.kind_name()
                ))
            }),
    }
}

impl From<CompareOp> for SqlOperator {
    fn from(op: CompareOp) -> Self {
        match op {
            CompareOp::Eq => Self::Eq,
            CompareOp::Ne => Self::Ne,
            CompareOp::Lt => Self::Lt,
            CompareOp::Lte => Self::Lte,
            CompareOp::Gt => Self::Gt,
            CompareOp::Gte => Self::Gte,
        }
    }
}

impl<'a> PredicateCompiler<'a> {
    /// Creates a compiler for a dialect and column scope.
    #[must_use]
    pub const fn new(dialect: &'a dyn Dialect, scope: Scope<'a>) -> Self {
        Self { dialect, scope }
    }

    /// Renders a column reference in this scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedAlias`] if the column's entity is not in
    /// scope.
    pub fn column(&self, col: &ColumnRef) -> Result<String> {
        let quoted = self.dialect.quote_identifier(&col.column);
        match self.scope {
            Scope::Table(entity) => {
                if col.entity != entity || col.occurrence.is_some_and(|n| n != 1) {
                    return Err(Error::UnresolvedAlias(format!(
                        "{col} is not a column of {entity}"
                    )));
                }
                Ok(quoted)
            }
            Scope::Aliased(aliases) => {
                let alias = aliases.resolve(col.entity, col.occurrence)?;
                Ok(format!("{alias}.{quoted}"))
            }
        }
    }

    /// Compiles one predicate, binding its values into `params`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedExpression`] for shapes with no SQL
    /// translation and [`Error::UnresolvedAlias`] for columns out of scope.
    pub fn compile(
        &self,
        predicate: &Predicate,
        params: &mut ParameterSet,
    ) -> Result<CompiledPredicate> {
        let mut fragments = Vec::new();
        self.walk(predicate, 0, &mut fragments, params)?;
        let sql = render(&fragments, self.dialect);
        trace!(sql = %sql, "Compiled predicate");
        Ok(CompiledPredicate { fragments, sql })
    }

    /// Compiles a list of predicates joined with AND, each wrapped in
    /// parentheses: `(p1) AND (p2)`. Returns `None` for an empty list.
    ///
    /// # Errors
    ///
    /// See [`PredicateCompiler::compile`].
    pub fn compile_all(
        &self,
        predicates: &[Predicate],
        params: &mut ParameterSet,
    ) -> Result<Option<String>> {
        if predicates.is_empty() {
            return Ok(None);
        }
        let parts = predicates
            .iter()
            .map(|p| self.compile(p, params).map(|c| format!("({})", c.sql)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(parts.join(" AND ")))
    }

    fn walk(
        &self,
        predicate: &Predicate,
        negations: usize,
        out: &mut Vec<Fragment>,
        params: &mut ParameterSet,
    ) -> Result<()> {
        let negated = negations % 2 == 1;
        match predicate {
            Predicate::Not(inner) => self.walk(inner, negations + 1, out, params),
            Predicate::And(left, right) | Predicate::Or(left, right) => {
                let combinator = if matches!(predicate, Predicate::And(..)) {
                    Combinator::And
                } else {
                    Combinator::Or
                };
                let combinator = if negated { combinator.dual() } else { combinator };
                out.push(Fragment::Open);
                self.walk(left, negations, out, params)?;
                out.push(Fragment::Close);
                out.push(Fragment::Combinator(combinator));
                out.push(Fragment::Open);
                self.walk(right, negations, out, params)?;
                out.push(Fragment::Close);
                Ok(())
            }
            Predicate::Literal(value) => {
                out.push(Fragment::Constant(*value != negated));
                Ok(())
            }
            Predicate::Comparison { left, op, right } => {
                let fragment = self.comparison(fold(left), *op, fold(right), negated, params)?;
                out.push(fragment);
                Ok(())
            }
            Predicate::Membership { column, values } => {
                let fragment = self.membership(fold(column), fold(values), negated, params)?;
                out.push(fragment);
                Ok(())
            }
            Predicate::Pattern {
                column,
                kind,
                value,
            } => {
                let fragment = self.pattern(fold(column), *kind, fold(value), negated, params)?;
                out.push(fragment);
                Ok(())
            }
        }
    }

    fn comparison(
        &self,
        left: Folded,
        op: CompareOp,
        right: Folded,
        negated: bool,
        params: &mut ParameterSet,
    ) -> Result<Fragment> {
        match (left, right) {
            (Folded::Column(col), Folded::Value(value)) => {
                self.value_condition(&col, op, value, negated, params)
            }
            (Folded::Value(value), Folded::Column(col)) => {
                self.value_condition(&col, op.mirror(), value, negated, params)
            }
            (Folded::Column(left), Folded::Column(right)) => Ok(Fragment::Condition(Condition {
                property: left.column.to_string(),
                column: self.column(&left)?,
                op: SqlOperator::from(op).negate_if(negated),
                operand: ConditionOperand::Column(self.column(&right)?),
            })),
            (Folded::Value(left), Folded::Value(right)) => {
                let holds = fold_comparison(&left, op, &right)?;
                Ok(Fragment::Constant(holds != negated))
            }
            (Folded::List(_), _) | (_, Folded::List(_)) => Err(Error::UnsupportedExpression(
                format!("list operand in a {op} comparison"),
            )),
        }
    }

    fn value_condition(
        &self,
        col: &ColumnRef,
        op: CompareOp,
        value: SqlValue,
        negated: bool,
        params: &mut ParameterSet,
    ) -> Result<Fragment> {
        let column = self.column(col)?;
        let (op, operand) = if value.is_null() {
            let op = match op {
                CompareOp::Eq => SqlOperator::IsNull,
                CompareOp::Ne => SqlOperator::IsNotNull,
                _ => {
                    return Err(Error::UnsupportedExpression(format!(
                        "{col} {op} NULL"
                    )))
                }
            };
            (op, ConditionOperand::None)
        } else {
            let name = params.bind(&col.column, value.clone());
            (
                SqlOperator::from(op),
                ConditionOperand::Parameter(Parameter::new(name, value)),
            )
        };
        Ok(Fragment::Condition(Condition {
            property: col.column.to_string(),
            column,
            op: op.negate_if(negated),
            operand,
        }))
    }

    fn membership(
        &self,
        column: Folded,
        values: Folded,
        negated: bool,
        params: &mut ParameterSet,
    ) -> Result<Fragment> {
        let values = match values {
            Folded::List(values) => values,
            Folded::Value(value) => vec![value],
            Folded::Column(col) => {
                return Err(Error::UnsupportedExpression(format!(
                    "column {col} used as a membership list"
                )))
            }
        };
        match column {
            Folded::Column(col) => {
                if values.is_empty() {
                    return Ok(Fragment::Constant(negated));
                }
                let rendered = self.column(&col)?;
                let bound = params.bind_list(&col.column, values);
                Ok(Fragment::Condition(Condition {
                    property: col.column.to_string(),
                    column: rendered,
                    op: SqlOperator::In.negate_if(negated),
                    operand: ConditionOperand::List(bound),
                }))
            }
            Folded::Value(value) => {
                let found = values.iter().any(|v| constants_equal(&value, v));
                Ok(Fragment::Constant(found != negated))
            }
            Folded::List(_) => Err(Error::UnsupportedExpression(
                "list tested for membership".to_string(),
            )),
        }
    }

    fn pattern(
        &self,
        column: Folded,
        kind: PatternKind,
        value: Folded,
        negated: bool,
        params: &mut ParameterSet,
    ) -> Result<Fragment> {
        let Folded::Value(SqlValue::Text(text)) = value else {
            return Err(Error::UnsupportedExpression(
                "pattern operand must be text".to_string(),
            ));
        };
        match column {
            Folded::Column(col) => {
                let rendered = self.column(&col)?;
                let pattern = SqlValue::Text(kind.like_pattern(&text));
                let name = params.bind(&col.column, pattern.clone());
                Ok(Fragment::Condition(Condition {
                    property: col.column.to_string(),
                    column: rendered,
                    op: SqlOperator::Like.negate_if(negated),
                    operand: ConditionOperand::Parameter(Parameter::new(name, pattern)),
                }))
            }
            Folded::Value(SqlValue::Text(subject)) => {
                Ok(Fragment::Constant(kind.matches(&subject, &text) != negated))
            }
            _ => Err(Error::UnsupportedExpression(
                "pattern subject must be a column or text".to_string(),
            )),
        }
    }
}
