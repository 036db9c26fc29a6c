use std::cmp::Ordering;

use crate::{
    executor::{
        data::{Data, MemoryData, snapshot_row},
        expr::{AggregateSlot, BoundExpr},
        task::Task,
    },
    functions::aggregate::Accumulator,
    types::{
        error::{DatabaseError, Result},
        value::Value,
    },
};

/// Materializing aggregation.
///
/// Without group columns the whole input forms one group and exactly one row
/// is produced, even for empty input. With group columns the input must
/// already be ordered by them: a group ends where the key of the current row
/// differs from the previous one, so unordered input yields fragmented
/// groups. Output rows follow the order in which groups appear.
pub struct AggregateTask<'a> {
    input: Option<Box<dyn Data + 'a>>,
    group_keys: Vec<usize>,
    slots: Vec<AggregateSlot>,
    projections: Vec<BoundExpr>,
    output: Option<MemoryData>,
}

/// State of the group currently being folded.
struct Group {
    key: Vec<Value>,
    first_row: Vec<Value>,
    accumulators: Vec<Accumulator>,
}

impl<'a> AggregateTask<'a> {
    pub fn new(
        input: Box<dyn Data + 'a>,
        group_keys: Vec<usize>,
        slots: Vec<AggregateSlot>,
        projections: Vec<BoundExpr>,
    ) -> Self {
        Self {
            input: Some(input),
            group_keys,
            slots,
            projections,
            output: None,
        }
    }

    fn fresh_accumulators(&self) -> Vec<Accumulator> {
        self.slots.iter().map(|s| s.function.accumulator()).collect()
    }

    fn group_key(&self, row: &[Value]) -> Result<Vec<Value>> {
        self.group_keys
            .iter()
            .map(|&i| {
                row.get(i)
                    .cloned()
                    .ok_or(DatabaseError::ColumnIndexOutOfBounds { index: i })
            })
            .collect()
    }

    fn fold_row(&self, accumulators: Vec<Accumulator>, row: &[Value]) -> Result<Vec<Accumulator>> {
        accumulators
            .into_iter()
            .zip(&self.slots)
            .map(|(acc, slot)| match &slot.arg {
                None => acc.fold(&Value::Null),
                Some(arg) => acc.fold(&arg.eval(row, &[])?),
            })
            .collect()
    }

    fn finish_group(&self, group: Group) -> Result<Vec<Value>> {
        let results: Vec<Value> = group
            .accumulators
            .into_iter()
            .map(Accumulator::finish)
            .collect();
        self.projections
            .iter()
            .map(|p| p.eval(group.first_row.as_slice(), &results))
            .collect()
    }
}

fn same_key(a: &[Value], b: &[Value]) -> Result<bool> {
    if a.len() != b.len() {
        return Err(DatabaseError::config(format!(
            "group keys of different length: {} and {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter()
        .zip(b)
        .all(|(x, y)| x.compare(y) == Some(Ordering::Equal)))
}

impl<'a> Task<'a> for AggregateTask<'a> {
    fn run(&mut self) -> Result<()> {
        let Some(mut input) = self.input.take() else {
            return Ok(());
        };

        let mut rows = Vec::new();
        let mut current: Option<Group> = None;
        while input.next()? {
            let row = snapshot_row(input.as_ref())?;
            let key = self.group_key(&row)?;

            let group = match current.take() {
                Some(group) if same_key(&group.key, &key)? => group,
                previous => {
                    if let Some(done) = previous {
                        rows.push(self.finish_group(done)?);
                    }
                    Group {
                        key,
                        first_row: row.clone(),
                        accumulators: self.fresh_accumulators(),
                    }
                }
            };
            let accumulators = self.fold_row(group.accumulators, &row)?;
            current = Some(Group {
                accumulators,
                ..group
            });
        }

        match current {
            Some(group) => rows.push(self.finish_group(group)?),
            None if self.group_keys.is_empty() => {
                let empty = Group {
                    key: Vec::new(),
                    first_row: vec![Value::Null; input.column_count()],
                    accumulators: self.fresh_accumulators(),
                };
                rows.push(self.finish_group(empty)?);
            }
            None => {}
        }

        tracing::debug!(groups = rows.len(), "aggregation finished");
        self.output = Some(MemoryData::new(self.projections.len(), rows)?);
        Ok(())
    }

    fn into_data(mut self: Box<Self>) -> Result<Box<dyn Data + 'a>> {
        self.run()?;
        let output = self.output.take().ok_or_else(|| DatabaseError::ExecutionError {
            details: "aggregation produced no output".to_string(),
        })?;
        Ok(Box::new(output))
    }
}
