//! Compiled predicate fragments and named parameters.

use std::fmt;

use crate::dialect::Dialect;
use crate::value::SqlValue;

/// A named parameter bound to a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name, without the dialect prefix.
    pub name: String,
    /// Bound value.
    pub value: SqlValue,
}

impl Parameter {
    /// Creates a parameter.
    pub fn new(name: impl Into<String>, value: SqlValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The parameters of one statement, unique by name.
///
/// A set can be carried from one clause to the next (an update's SET list
/// into its WHERE clause) so later clauses never reuse a taken name for a
/// different value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a value under `base`, returning the name used.
    ///
    /// The first binding takes `base` itself. A later binding of the same
    /// value reuses its name; a different value takes the first free name of
    /// `base2`, `base3`, ...
    pub fn bind(&mut self, base: &str, value: SqlValue) -> String {
        if let Some(existing) = self
            .params
            .iter()
            .find(|p| p.value == value && is_suffixed_name(&p.name, base))
        {
            return existing.name.clone();
        }

        let mut name = base.to_string();
        let mut suffix = 1;
        while self.contains(&name) {
            suffix += 1;
            name = format!("{base}{suffix}");
        }
        self.params.push(Parameter::new(name.clone(), value));
        name
    }

    /// Binds each value of a membership list as `<base>_InParam_<n>`, with
    /// `n` counting from 1 and skipping names already taken.
    pub fn bind_list(&mut self, base: &str, values: Vec<SqlValue>) -> Vec<Parameter> {
        let mut bound = Vec::with_capacity(values.len());
        let mut n = 1;
        for value in values {
            let mut name = format!("{base}_InParam_{n}");
            while self.contains(&name) {
                n += 1;
                name = format!("{base}_InParam_{n}");
            }
            n += 1;
            let param = Parameter::new(name, value);
            self.params.push(param.clone());
            bound.push(param);
        }
        bound
    }

    /// Returns true if a parameter with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// Returns the value bound under a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Returns the parameters in binding order.
    #[must_use]
    pub fn as_slice(&self) -> &[Parameter] {
        &self.params
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if no parameter is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Consumes the set, returning the parameters in binding order.
    #[must_use]
    pub fn into_vec(self) -> Vec<Parameter> {
        self.params
    }
}

fn is_suffixed_name(name: &str, base: &str) -> bool {
    name.strip_prefix(base)
        .is_some_and(|rest| rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Boolean combinator between two parenthesized operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// AND
    And,
    /// OR
    Or,
}

impl Combinator {
    /// Returns the dual combinator (De Morgan).
    #[must_use]
    pub const fn dual(self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// SQL operator of a compiled condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperator {
    /// =
    Eq,
    /// !=
    Ne,
    /// <
    Lt,
    /// <=
    Lte,
    /// >
    Gt,
    /// >=
    Gte,
    /// IN
    In,
    /// NOT IN
    NotIn,
    /// LIKE
    Like,
    /// NOT LIKE
    NotLike,
    /// IS NULL
    IsNull,
    /// IS NOT NULL
    IsNotNull,
}

impl SqlOperator {
    /// Returns the operator that holds exactly when this one does not.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Gte,
            Self::Gte => Self::Lt,
            Self::Gt => Self::Lte,
            Self::Lte => Self::Gt,
            Self::In => Self::NotIn,
            Self::NotIn => Self::In,
            Self::Like => Self::NotLike,
            Self::NotLike => Self::Like,
            Self::IsNull => Self::IsNotNull,
            Self::IsNotNull => Self::IsNull,
        }
    }

    /// Negates the operator when `negated` is set.
    #[must_use]
    pub const fn negate_if(self, negated: bool) -> Self {
        if negated {
            self.negate()
        } else {
            self
        }
    }
}

impl fmt::Display for SqlOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        };
        f.write_str(s)
    }
}

/// Right-hand side of a compiled condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionOperand {
    /// No operand (`IS NULL`, `IS NOT NULL`).
    None,
    /// A bound parameter.
    Parameter(Parameter),
    /// A list of bound parameters for `IN`.
    List(Vec<Parameter>),
    /// Another column, already rendered.
    Column(String),
}

/// A single compiled test on a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Property (column) name the condition tests.
    pub property: String,
    /// Rendered column, quoted and alias-qualified if needed.
    pub column: String,
    /// Operator.
    pub op: SqlOperator,
    /// Operand.
    pub operand: ConditionOperand,
}

impl Condition {
    /// Returns true if the condition compares two columns.
    #[must_use]
    pub const fn is_column_comparison(&self) -> bool {
        matches!(self.operand, ConditionOperand::Column(_))
    }

    fn render_into(&self, sql: &mut String, dialect: &dyn Dialect) {
        sql.push_str(&self.column);
        sql.push(' ');
        sql.push_str(&self.op.to_string());
        match &self.operand {
            ConditionOperand::None => {}
            ConditionOperand::Parameter(param) => {
                sql.push(' ');
                sql.push_str(&dialect.parameter(&param.name));
            }
            ConditionOperand::List(params) => {
                let names: Vec<String> = params.iter().map(|p| dialect.parameter(&p.name)).collect();
                sql.push_str(" (");
                sql.push_str(&names.join(", "));
                sql.push(')');
            }
            ConditionOperand::Column(column) => {
                sql.push(' ');
                sql.push_str(column);
            }
        }
    }
}

/// One element of a compiled predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Opening parenthesis.
    Open,
    /// Closing parenthesis.
    Close,
    /// AND / OR between two parenthesized groups.
    Combinator(Combinator),
    /// A folded constant, rendered `1 = 1` or `1 = 0`.
    Constant(bool),
    /// A test on a column.
    Condition(Condition),
}

/// Renders fragments to SQL text.
#[must_use]
pub fn render(fragments: &[Fragment], dialect: &dyn Dialect) -> String {
    let mut sql = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Open => sql.push('('),
            Fragment::Close => sql.push(')'),
            Fragment::Combinator(op) => {
                sql.push(' ');
                sql.push_str(&op.to_string());
                sql.push(' ');
            }
            Fragment::Constant(true) => sql.push_str("1 = 1"),
            Fragment::Constant(false) => sql.push_str("1 = 0"),
            Fragment::Condition(condition) => condition.render_into(&mut sql, dialect),
        }
    }
    sql
}

/// Output of compiling one predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    /// Fragments in output order.
    pub fragments: Vec<Fragment>,
    /// Rendered SQL, without the outer parentheses added by the consumer.
    pub sql: String,
}

impl CompiledPredicate {
    /// Returns the conditions in output order.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.fragments.iter().filter_map(|f| match f {
            Fragment::Condition(c) => Some(c),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqliteDialect;

    #[test]
    fn test_bind_same_value_reuses_name() {
        let mut params = ParameterSet::new();
        assert_eq!(params.bind("Name", SqlValue::Text("a".into())), "Name");
        assert_eq!(params.bind("Name", SqlValue::Text("a".into())), "Name");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_bind_different_value_takes_suffix() {
        let mut params = ParameterSet::new();
        assert_eq!(params.bind("Name", SqlValue::Text("a".into())), "Name");
        assert_eq!(params.bind("Name", SqlValue::Text("b".into())), "Name2");
        assert_eq!(params.bind("Name", SqlValue::Text("c".into())), "Name3");
        assert_eq!(params.bind("Name", SqlValue::Text("b".into())), "Name2");
        assert_eq!(params.get("Name3"), Some(&SqlValue::Text("c".into())));
    }

    #[test]
    fn test_bind_list_skips_taken_names() {
        let mut params = ParameterSet::new();
        params.bind("id_InParam_2", SqlValue::Int(99));
        let bound = params.bind_list("id", vec![SqlValue::Int(1), SqlValue::Int(2)]);
        let names: Vec<_> = bound.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id_InParam_1", "id_InParam_3"]);
    }

    #[test]
    fn test_negate_is_involution() {
        for op in [
            SqlOperator::Eq,
            SqlOperator::Lt,
            SqlOperator::Gt,
            SqlOperator::In,
            SqlOperator::Like,
            SqlOperator::IsNull,
        ] {
            assert_eq!(op.negate().negate(), op);
        }
        assert_eq!(SqlOperator::Lt.negate(), SqlOperator::Gte);
        assert_eq!(SqlOperator::Gt.negate(), SqlOperator::Lte);
    }

    #[test]
    fn test_render_fragments() {
        let fragments = vec![
            Fragment::Open,
            Fragment::Condition(Condition {
                property: "a".into(),
                column: "\"a\"".into(),
                op: SqlOperator::Eq,
                operand: ConditionOperand::Parameter(Parameter::new("a", SqlValue::Int(1))),
            }),
            Fragment::Close,
            Fragment::Combinator(Combinator::Or),
            Fragment::Open,
            Fragment::Constant(false),
            Fragment::Close,
        ];
        assert_eq!(
            render(&fragments, &SqliteDialect),
            "(\"a\" = @a) OR (1 = 0)"
        );
    }
}
