use std::cmp::Ordering;

use crate::{
    executor::{
        data::{Data, MemoryData, snapshot_row},
        expr::BoundExpr,
        task::Task,
    },
    types::{
        error::{DatabaseError, Result},
        value::Value,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub expr: BoundExpr,
    pub ascending: bool,
}

impl SortSpec {
    pub fn new(expr: BoundExpr, ascending: bool) -> Self {
        Self { expr, ascending }
    }
}

/// Materializing stable sort. NULL sorts first in ascending order.
pub struct SortTask<'a> {
    input: Option<Box<dyn Data + 'a>>,
    keys: Vec<SortSpec>,
    output: Option<MemoryData>,
}

impl<'a> SortTask<'a> {
    pub fn new(input: Box<dyn Data + 'a>, keys: Vec<SortSpec>) -> Self {
        Self {
            input: Some(input),
            keys,
            output: None,
        }
    }
}

impl<'a> Task<'a> for SortTask<'a> {
    fn run(&mut self) -> Result<()> {
        let Some(mut input) = self.input.take() else {
            return Ok(());
        };
        let width = input.column_count();

        let mut entries: Vec<(Vec<Value>, Vec<Value>)> = Vec::new();
        while input.next()? {
            let row = snapshot_row(input.as_ref())?;
            let key = self
                .keys
                .iter()
                .map(|k| k.expr.eval(row.as_slice(), &[]))
                .collect::<Result<Vec<_>>>()?;
            entries.push((key, row));
        }

        let mut failure: Option<DatabaseError> = None;
        entries.sort_by(|(a, _), (b, _)| {
            for ((x, y), spec) in a.iter().zip(b).zip(&self.keys) {
                let ord = match x.compare(y) {
                    Some(ord) => ord,
                    None => {
                        if failure.is_none() {
                            failure = Some(DatabaseError::type_mismatch(
                                "order by",
                                x.data_type().to_string(),
                                y.data_type().to_string(),
                            ));
                        }
                        Ordering::Equal
                    }
                };
                let ord = if spec.ascending { ord } else { ord.reverse() };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        if let Some(e) = failure {
            return Err(e);
        }

        let rows = entries.into_iter().map(|(_, row)| row).collect();
        self.output = Some(MemoryData::new(width, rows)?);
        Ok(())
    }

    fn into_data(mut self: Box<Self>) -> Result<Box<dyn Data + 'a>> {
        self.run()?;
        let output = self.output.take().ok_or_else(|| DatabaseError::ExecutionError {
            details: "sort produced no output".to_string(),
        })?;
        Ok(Box::new(output))
    }
}
