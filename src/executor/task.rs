use crate::{executor::data::Data, types::error::Result};

/// One production step of a query pipeline.
///
/// Streaming tasks only wire their inputs in `run`; materializing tasks
/// (aggregation, sorting) consume their whole input there. `into_data`
/// hands out the result cursor and runs the task first if needed.
pub trait Task<'a> {
    fn run(&mut self) -> Result<()>;
    fn into_data(self: Box<Self>) -> Result<Box<dyn Data + 'a>>;
}

pub fn execute<'a>(mut task: Box<dyn Task<'a> + 'a>) -> Result<Box<dyn Data + 'a>> {
    task.run()?;
    task.into_data()
}
