use std::cmp::Ordering;

use crate::types::{
    error::{DatabaseError, Result},
    value::{DataType, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Min,
    Max,
    Sum,
    Count,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Count => "count",
        }
    }

    pub fn accumulator(&self) -> Accumulator {
        match self {
            AggregateFunction::Min => Accumulator::Min(None),
            AggregateFunction::Max => Accumulator::Max(None),
            AggregateFunction::Sum => Accumulator::Sum(None),
            AggregateFunction::Count => Accumulator::Count(0),
        }
    }
}

/// Running state of one aggregate over one group. A fresh accumulator is
/// created per group and folded row by row.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count(i64),
    Sum(Option<i64>),
    Min(Option<Value>),
    Max(Option<Value>),
}

impl Accumulator {
    pub fn fold(self, value: &Value) -> Result<Self> {
        match self {
            // count only accepts `*`, so every row counts
            Accumulator::Count(n) => Ok(Accumulator::Count(n + 1)),
            Accumulator::Sum(total) => {
                if value.is_null() {
                    return Ok(Accumulator::Sum(total));
                }
                let v = value.as_i64().ok_or_else(|| {
                    DatabaseError::type_mismatch(
                        "sum()",
                        DataType::Long.to_string(),
                        value.data_type().to_string(),
                    )
                })?;
                let sum = total
                    .unwrap_or(0)
                    .checked_add(v)
                    .ok_or_else(|| DatabaseError::ExecutionError {
                        details: "sum() overflowed a 64-bit integer".to_string(),
                    })?;
                Ok(Accumulator::Sum(Some(sum)))
            }
            Accumulator::Min(current) => Ok(Accumulator::Min(extreme(
                "min()",
                current,
                value,
                Ordering::Less,
            )?)),
            Accumulator::Max(current) => Ok(Accumulator::Max(extreme(
                "max()",
                current,
                value,
                Ordering::Greater,
            )?)),
        }
    }

    pub fn finish(self) -> Value {
        match self {
            Accumulator::Count(n) => Value::Long(n),
            Accumulator::Sum(total) => total.map_or(Value::Null, Value::Long),
            Accumulator::Min(v) | Accumulator::Max(v) => v.unwrap_or(Value::Null),
        }
    }
}

/// Keeps whichever of `current` and `value` sorts towards `wanted`.
fn extreme(
    context: &str,
    current: Option<Value>,
    value: &Value,
    wanted: Ordering,
) -> Result<Option<Value>> {
    if value.is_null() {
        return Ok(current);
    }
    let Some(current) = current else {
        return Ok(Some(value.clone()));
    };
    match value.compare(&current) {
        Some(ord) if ord == wanted => Ok(Some(value.clone())),
        Some(_) => Ok(Some(current)),
        None => Err(DatabaseError::type_mismatch(
            context,
            current.data_type().to_string(),
            value.data_type().to_string(),
        )),
    }
}
