use serde::{Deserialize, Serialize};

use crate::types::value::Value;

/// A column qualified by the position of its table in the flattened FROM
/// list (joins contribute their left tables first, then their right ones).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FQColumn {
    pub table: usize,
    pub column: usize,
}

impl FQColumn {
    pub fn new(table: usize, column: usize) -> Self {
        Self { table, column }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Column(FQColumn),
    Literal(Value),
    /// `*`: every column when projected, or the argument of `count(*)`.
    Wildcard,
    Function(FunctionCall),
}

impl Expr {
    pub fn column(table: usize, column: usize) -> Self {
        Expr::Column(FQColumn::new(table, column))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn function(name: &str, args: Vec<Expr>) -> Self {
        Expr::Function(FunctionCall {
            name: name.to_string(),
            args,
        })
    }

    // Built-in functions
    pub fn upper(expr: Expr) -> Self {
        Self::function("upper", vec![expr])
    }

    pub fn lower(expr: Expr) -> Self {
        Self::function("lower", vec![expr])
    }

    pub fn length(expr: Expr) -> Self {
        Self::function("length", vec![expr])
    }

    pub fn concat(args: Vec<Expr>) -> Self {
        Self::function("concat", args)
    }

    pub fn count_star() -> Self {
        Self::function("count", vec![Expr::Wildcard])
    }

    pub fn min(expr: Expr) -> Self {
        Self::function("min", vec![expr])
    }

    pub fn max(expr: Expr) -> Self {
        Self::function("max", vec![expr])
    }

    pub fn sum(expr: Expr) -> Self {
        Self::function("sum", vec![expr])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    pub left: Expr,
    pub op: CompareOp,
    pub right: Expr,
}

impl Equation {
    pub fn new(left: Expr, op: CompareOp, right: Expr) -> Self {
        Self { left, op, right }
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::new(left, CompareOp::Equal, right)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Equation(Equation),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    pub fn compare(left: Expr, op: CompareOp, right: Expr) -> Self {
        Condition::Equation(Equation::new(left, op, right))
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }
}
