use crate::{
    executor::{data::Data, expr::BoundCondition, task::Task},
    types::{error::Result, value::Value},
};

/// Streams the input rows for which the condition holds.
pub struct FilterTask<'a> {
    input: Box<dyn Data + 'a>,
    condition: BoundCondition,
}

impl<'a> FilterTask<'a> {
    pub fn new(input: Box<dyn Data + 'a>, condition: BoundCondition) -> Self {
        Self { input, condition }
    }
}

impl<'a> Task<'a> for FilterTask<'a> {
    fn run(&mut self) -> Result<()> {
        Ok(())
    }

    fn into_data(self: Box<Self>) -> Result<Box<dyn Data + 'a>> {
        Ok(self)
    }
}

impl Data for FilterTask<'_> {
    fn next(&mut self) -> Result<bool> {
        while self.input.next()? {
            if self.condition.eval(self.input.as_ref())? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get(&self, index: usize) -> Result<&Value> {
        self.input.get(index)
    }

    fn column_count(&self) -> usize {
        self.input.column_count()
    }

    fn rewind(&mut self) -> Result<()> {
        self.input.rewind()
    }
}
