//! Predicate AST and its compilation to parameterized SQL.
//!
//! A [`Predicate`] is compiled by [`PredicateCompiler`] into an ordered list
//! of [`Fragment`]s and rendered SQL text. Every value is bound as a named
//! [`Parameter`] in a [`ParameterSet`] shared by the whole statement.

mod ast;
mod compiler;
mod fragment;

pub use ast::{Col, ColumnRef, CompareOp, Computed, Operand, PatternKind, Predicate};
pub use compiler::{PredicateCompiler, Scope};
pub use fragment::{
    render, Combinator, CompiledPredicate, Condition, ConditionOperand, Fragment, Parameter,
    ParameterSet, SqlOperator,
};
