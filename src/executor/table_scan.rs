use crate::{
    executor::{data::Data, table_source::TableSource, task::Task},
    types::error::{DatabaseError, Result},
};

/// Leaf task: opens a streaming cursor over one table.
pub struct TableScanTask<'a> {
    table: &'a dyn TableSource,
    data: Option<Box<dyn Data + 'a>>,
}

impl<'a> TableScanTask<'a> {
    pub fn new(table: &'a dyn TableSource) -> Self {
        Self { table, data: None }
    }
}

impl<'a> Task<'a> for TableScanTask<'a> {
    fn run(&mut self) -> Result<()> {
        if self.data.is_none() {
            tracing::debug!(table = self.table.name(), "opening table scan");
            self.data = Some(self.table.open()?);
        }
        Ok(())
    }

    fn into_data(mut self: Box<Self>) -> Result<Box<dyn Data + 'a>> {
        self.run()?;
        self.data.take().ok_or_else(|| DatabaseError::ExecutionError {
            details: format!("scan of '{}' produced no cursor", self.table.name()),
        })
    }
}
