//! AST for the Cypher dialect.
//!
//! All types are owned so compiled plans can be cached and re-executed
//! after the query text is gone. Pattern property values keep parameter
//! references unresolved; the parameter binder substitutes them into a
//! cloned pattern per invocation.

use std::fmt;

use crate::graph::Direction;
use crate::value::Value;

/// A property-map value inside a pattern: either a literal or a `$param`
/// reference resolved at bind time.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternValue {
    Literal(Value),
    Parameter(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Vec<(String, PatternValue)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPattern {
    pub variable: Option<String>,
    pub rel_type: Option<String>,
    pub direction: Direction,
    pub properties: Vec<(String, PatternValue)>,
    /// Variable-length lower bound; None for a plain single hop.
    pub min_hops: Option<u32>,
    /// Variable-length upper bound; None with `min_hops` set means
    /// unbounded (capped at the configured max traversal depth).
    pub max_hops: Option<u32>,
}

impl RelationshipPattern {
    pub fn is_variable_length(&self) -> bool {
        self.min_hops.is_some() || self.max_hops.is_some()
    }
}

/// A linear path shape: `nodes.len() == relationships.len() + 1`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathPattern {
    pub nodes: Vec<NodePattern>,
    pub relationships: Vec<RelationshipPattern>,
}

impl PathPattern {
    pub fn single_node(node: NodePattern) -> Self {
        PathPattern {
            nodes: vec![node],
            relationships: Vec::new(),
        }
    }

    /// Variables named anywhere in the pattern, in appearance order.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(v) = &node.variable {
                out.push(v.as_str());
            }
            if let Some(rel) = self.relationships.get(i) {
                if let Some(v) = &rel.variable {
                    out.push(v.as_str());
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    StartsWith,
    EndsWith,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpression {
    /// Simple CASE operand; None for the searched form.
    pub operand: Option<Box<Expression>>,
    pub when_then: Vec<(Expression, Expression)>,
    pub else_expr: Option<Box<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// `$name`; read from the initial binding at evaluation time.
    Parameter(String),
    /// `variable.property`. An empty property name yields the whole bound
    /// value (bare-variable pass-through).
    Property { variable: String, property: String },
    List(Vec<Expression>),
    /// `name(args)`; a namespaced call `a.b(args)` is the function named
    /// "a.b".
    FunctionCall { name: String, args: Vec<Expression> },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Case(CaseExpression),
}

impl Expression {
    pub fn variable(name: impl Into<String>) -> Expression {
        Expression::Property {
            variable: name.into(),
            property: String::new(),
        }
    }

    pub fn property(variable: impl Into<String>, property: impl Into<String>) -> Expression {
        Expression::Property {
            variable: variable.into(),
            property: property.into(),
        }
    }

    /// Default column name when no alias is given: `var.prop` for a
    /// property, `name(...)` for a function result, `<invalid>` otherwise.
    pub fn default_column_name(&self) -> String {
        match self {
            Expression::Property { variable, property } => {
                if property.is_empty() {
                    variable.clone()
                } else {
                    format!("{}.{}", variable, property)
                }
            }
            Expression::FunctionCall { name, .. } => format!("{}(...)", name),
            _ => "<invalid>".to_string(),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::In => "IN",
            BinaryOp::StartsWith => "STARTS WITH",
            BinaryOp::EndsWith => "ENDS WITH",
            BinaryOp::Contains => "CONTAINS",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Modulo => "%",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Expression {
    /// Approximate Cypher rendering, used by EXPLAIN details and filter
    /// warnings.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(Value::String(s)) => write!(f, "'{}'", s),
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Parameter(name) => write!(f, "${}", name),
            Expression::Property { variable, property } => {
                if property.is_empty() {
                    write!(f, "{}", variable)
                } else {
                    write!(f, "{}.{}", variable, property)
                }
            }
            Expression::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expression::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
            Expression::Arithmetic { op, left, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
            Expression::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "(NOT {})", operand),
                UnaryOp::Minus => write!(f, "(-{})", operand),
                UnaryOp::IsNull => write!(f, "({} IS NULL)", operand),
                UnaryOp::IsNotNull => write!(f, "({} IS NOT NULL)", operand),
            },
            Expression::Case(case) => {
                write!(f, "CASE")?;
                if let Some(operand) = &case.operand {
                    write!(f, " {}", operand)?;
                }
                for (when, then) in &case.when_then {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(else_expr) = &case.else_expr {
                    write!(f, " ELSE {}", else_expr)?;
                }
                write!(f, " END")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Collect,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Collect => "COLLECT",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub aggregate: Option<Aggregate>,
    /// None only for `COUNT(*)`.
    pub expression: Option<Expression>,
    pub alias: Option<String>,
}

impl ReturnItem {
    /// Column name per the naming rule: alias, `AGG(var.prop)`,
    /// `COUNT(*)`, `var.prop`, `name(...)`, `<invalid>`.
    pub fn column_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match (&self.aggregate, &self.expression) {
            (Some(agg), Some(expr)) => format!("{}({})", agg, expr.default_column_name()),
            (Some(agg), None) => format!("{}(*)", agg),
            (None, Some(expr)) => expr.default_column_name(),
            (None, None) => "<invalid>".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnClause {
    pub distinct: bool,
    pub items: Vec<ReturnItem>,
    pub group_by: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    pub patterns: Vec<PathPattern>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionalMatchClause {
    pub patterns: Vec<PathPattern>,
    pub where_clause: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateClause {
    pub patterns: Vec<PathPattern>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeClause {
    pub pattern: PathPattern,
    pub on_create_set: Option<SetClause>,
    pub on_match_set: Option<SetClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetItem {
    pub variable: String,
    pub property: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    pub items: Vec<SetItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoveItem {
    Property { variable: String, property: String },
    Label { variable: String, label: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveClause {
    pub items: Vec<RemoveItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteClause {
    pub detach: bool,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnwindClause {
    pub expression: Expression,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithItem {
    pub expression: Expression,
    pub alias: Option<String>,
}

impl WithItem {
    pub fn binding_name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.expression.default_column_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithClause {
    pub items: Vec<WithItem>,
    pub where_clause: Option<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expression: Expression,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub items: Vec<OrderByItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionClause {
    /// UNION ALL keeps duplicates.
    pub all: bool,
    pub query: Box<Query>,
}

/// One parsed query segment. WITH and UNION split the statement into
/// chained segments (`next` / `union`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub match_clause: Option<MatchClause>,
    pub optional_match_clauses: Vec<OptionalMatchClause>,
    pub where_clause: Option<Expression>,
    pub create_clause: Option<CreateClause>,
    pub merge_clause: Option<MergeClause>,
    pub unwind_clause: Option<UnwindClause>,
    pub set_clause: Option<SetClause>,
    pub remove_clause: Option<RemoveClause>,
    pub delete_clause: Option<DeleteClause>,
    pub with_clause: Option<WithClause>,
    pub return_clause: Option<ReturnClause>,
    pub order_by: Option<OrderByClause>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    /// Query after WITH.
    pub next: Option<Box<Query>>,
    /// Right-hand query of UNION [ALL].
    pub union: Option<UnionClause>,
    pub explain: bool,
    pub profile: bool,
}

impl Query {
    pub fn is_empty(&self) -> bool {
        self.match_clause.is_none()
            && self.optional_match_clauses.is_empty()
            && self.where_clause.is_none()
            && self.create_clause.is_none()
            && self.merge_clause.is_none()
            && self.unwind_clause.is_none()
            && self.set_clause.is_none()
            && self.remove_clause.is_none()
            && self.delete_clause.is_none()
            && self.with_clause.is_none()
            && self.return_clause.is_none()
    }
}
