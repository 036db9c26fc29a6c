use crate::{
    executor::{
        data::{Data, not_positioned},
        expr::BoundExpr,
        task::Task,
    },
    types::{
        error::{DatabaseError, Result},
        holder::{Holder, invalidate_all},
        value::Value,
    },
};

/// Streaming projection for queries without aggregates. Each output column
/// is evaluated into its own holder when the input advances.
pub struct ProjectTask<'a> {
    input: Box<dyn Data + 'a>,
    exprs: Vec<BoundExpr>,
    holders: Vec<Holder>,
}

impl<'a> ProjectTask<'a> {
    pub fn new(input: Box<dyn Data + 'a>, exprs: Vec<BoundExpr>) -> Self {
        let holders = Holder::with_columns(exprs.len());
        Self {
            input,
            exprs,
            holders,
        }
    }
}

impl<'a> Task<'a> for ProjectTask<'a> {
    fn run(&mut self) -> Result<()> {
        Ok(())
    }

    fn into_data(self: Box<Self>) -> Result<Box<dyn Data + 'a>> {
        Ok(self)
    }
}

impl Data for ProjectTask<'_> {
    fn next(&mut self) -> Result<bool> {
        invalidate_all(&mut self.holders);
        if !self.input.next()? {
            return Ok(false);
        }
        for (expr, holder) in self.exprs.iter().zip(self.holders.iter_mut()) {
            holder.set(expr.eval(self.input.as_ref(), &[])?);
        }
        Ok(true)
    }

    fn get(&self, index: usize) -> Result<&Value> {
        let holder = self
            .holders
            .get(index)
            .ok_or(DatabaseError::ColumnIndexOutOfBounds { index })?;
        if !holder.is_valid() {
            return Err(not_positioned());
        }
        Ok(holder.get())
    }

    fn column_count(&self) -> usize {
        self.exprs.len()
    }

    fn rewind(&mut self) -> Result<()> {
        invalidate_all(&mut self.holders);
        self.input.rewind()
    }
}
