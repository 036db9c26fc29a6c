use std::cmp::Ordering;

use crate::{
    executor::data::Columns,
    functions::{
        FunctionDef, FunctionRegistry, aggregate::AggregateFunction, scalar::ScalarFunction,
    },
    planner::{
        expression::{CompareOp, Condition, Equation, Expr},
        select::TableMap,
    },
    types::{
        error::{DatabaseError, Result},
        value::Value,
    },
};

/// An expression with columns resolved to absolute offsets and functions
/// resolved to their implementations.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    Column(usize),
    Literal(Value),
    Scalar {
        function: ScalarFunction,
        args: Vec<BoundExpr>,
    },
    /// Result of the aggregate in the given slot of the enclosing
    /// aggregation.
    Aggregate(usize),
}

/// One aggregate call; `arg` is `None` for `count(*)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSlot {
    pub function: AggregateFunction,
    pub arg: Option<BoundExpr>,
}

impl BoundExpr {
    pub fn eval<C: Columns + ?Sized>(&self, row: &C, slots: &[Value]) -> Result<Value> {
        match self {
            BoundExpr::Column(index) => row.column(*index).cloned(),
            BoundExpr::Literal(value) => Ok(value.clone()),
            BoundExpr::Scalar { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(row, slots))
                    .collect::<Result<Vec<_>>>()?;
                function.call(&values)
            }
            BoundExpr::Aggregate(slot) => slots.get(*slot).cloned().ok_or_else(|| {
                DatabaseError::ExecutionError {
                    details: format!("aggregate slot {} evaluated outside aggregation", slot),
                }
            }),
        }
    }
}

/// Resolves `Expr` trees against a table map. Aggregates are collected into
/// slots when allowed; column references made outside any aggregate are
/// remembered so grouping rules can be checked.
pub struct ExprCompiler<'r> {
    registry: &'r FunctionRegistry,
    table_map: &'r TableMap,
    allow_aggregates: bool,
    inside_aggregate: bool,
    slots: Vec<AggregateSlot>,
    free_columns: Vec<usize>,
}

impl<'r> ExprCompiler<'r> {
    pub fn new(registry: &'r FunctionRegistry, table_map: &'r TableMap) -> Self {
        Self {
            registry,
            table_map,
            allow_aggregates: false,
            inside_aggregate: false,
            slots: Vec::new(),
            free_columns: Vec::new(),
        }
    }

    pub fn with_aggregates(mut self) -> Self {
        self.allow_aggregates = true;
        self
    }

    pub fn slots(&self) -> &[AggregateSlot] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<AggregateSlot> {
        self.slots
    }

    pub fn free_columns(&self) -> &[usize] {
        &self.free_columns
    }

    pub fn compile(&mut self, expr: &Expr) -> Result<BoundExpr> {
        match expr {
            Expr::Column(column) => {
                let offset = self.table_map.resolve(*column)?;
                if !self.inside_aggregate {
                    self.free_columns.push(offset);
                }
                Ok(BoundExpr::Column(offset))
            }
            Expr::Literal(value) => Ok(BoundExpr::Literal(value.clone())),
            Expr::Wildcard => Err(DatabaseError::config(
                "'*' is only allowed as a projection or as the argument of count()",
            )),
            Expr::Function(call) => match self.registry.lookup(&call.name)? {
                FunctionDef::Scalar(function) => {
                    function.check_arity(call.args.len())?;
                    let args = call
                        .args
                        .iter()
                        .map(|arg| self.compile(arg))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(BoundExpr::Scalar { function, args })
                }
                FunctionDef::Aggregate(function) => self.compile_aggregate(function, &call.args),
            },
        }
    }

    fn compile_aggregate(&mut self, function: AggregateFunction, args: &[Expr]) -> Result<BoundExpr> {
        if !self.allow_aggregates {
            return Err(DatabaseError::config(format!(
                "aggregate {}() is not allowed here",
                function.name()
            )));
        }
        if self.inside_aggregate {
            return Err(DatabaseError::config(format!(
                "aggregate {}() cannot be nested inside another aggregate",
                function.name()
            )));
        }

        let arg = match (function, args) {
            (AggregateFunction::Count, [Expr::Wildcard]) => None,
            (AggregateFunction::Count, _) => {
                return Err(DatabaseError::config("count() only accepts '*'"));
            }
            (_, [single]) => {
                self.inside_aggregate = true;
                let compiled = self.compile(single);
                self.inside_aggregate = false;
                Some(compiled?)
            }
            (_, _) => {
                return Err(DatabaseError::config(format!(
                    "{}() takes exactly 1 argument, got {}",
                    function.name(),
                    args.len()
                )));
            }
        };

        self.slots.push(AggregateSlot { function, arg });
        Ok(BoundExpr::Aggregate(self.slots.len() - 1))
    }

    pub fn compile_condition(&mut self, condition: &Condition) -> Result<BoundCondition> {
        match condition {
            Condition::Equation(Equation { left, op, right }) => Ok(BoundCondition::Compare {
                left: self.compile(left)?,
                op: *op,
                right: self.compile(right)?,
            }),
            Condition::And(a, b) => Ok(BoundCondition::And(
                Box::new(self.compile_condition(a)?),
                Box::new(self.compile_condition(b)?),
            )),
            Condition::Or(a, b) => Ok(BoundCondition::Or(
                Box::new(self.compile_condition(a)?),
                Box::new(self.compile_condition(b)?),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundCondition {
    Compare {
        left: BoundExpr,
        op: CompareOp,
        right: BoundExpr,
    },
    And(Box<BoundCondition>, Box<BoundCondition>),
    Or(Box<BoundCondition>, Box<BoundCondition>),
}

impl BoundCondition {
    pub fn eval<C: Columns + ?Sized>(&self, row: &C) -> Result<bool> {
        match self {
            BoundCondition::Compare { left, op, right } => {
                let l = left.eval(row, &[])?;
                let r = right.eval(row, &[])?;
                Ok(compare_values(&l, *op, &r))
            }
            BoundCondition::And(a, b) => Ok(a.eval(row)? && b.eval(row)?),
            BoundCondition::Or(a, b) => Ok(a.eval(row)? || b.eval(row)?),
        }
    }
}

/// NULL on either side is never true. Values without a common ordering are
/// only ever "not equal".
pub fn compare_values(left: &Value, op: CompareOp, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }
    match left.compare(right) {
        None => op == CompareOp::NotEqual,
        Some(ord) => match op {
            CompareOp::Equal => ord == Ordering::Equal,
            CompareOp::NotEqual => ord != Ordering::Equal,
            CompareOp::LessThan => ord == Ordering::Less,
            CompareOp::GreaterThan => ord == Ordering::Greater,
            CompareOp::LessThanOrEqual => ord != Ordering::Greater,
            CompareOp::GreaterThanOrEqual => ord != Ordering::Less,
        },
    }
}
