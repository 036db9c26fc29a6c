use std::sync::Arc;

use crate::{
    executor::{
        data::{Data, MemoryData, not_positioned},
        scan::Scanner,
        sequential_scan::SequentialScanner,
    },
    storage::{database::Database, schema::TableDef},
    types::{
        error::{DatabaseError, Result},
        holder::Holder,
        value::Value,
    },
};

/// Anything a query can read rows from.
pub trait TableSource {
    fn name(&self) -> &str;
    fn column_names(&self) -> Vec<String>;
    fn open(&self) -> Result<Box<dyn Data + '_>>;
}

/// A table stored in a Jet database file.
pub struct JetTable<'db> {
    db: &'db Database,
    def: Arc<TableDef>,
}

impl<'db> JetTable<'db> {
    pub fn new(db: &'db Database, def: Arc<TableDef>) -> Self {
        Self { db, def }
    }

    pub fn definition(&self) -> &Arc<TableDef> {
        &self.def
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.def
            .column_index(name)
            .ok_or_else(|| DatabaseError::config(format!(
                "table '{}' has no column '{}'",
                self.def.name, name
            )))
    }

    pub fn scanner(&self) -> SequentialScanner<'db> {
        SequentialScanner::new(self.db, Arc::clone(&self.def))
    }
}

impl TableSource for JetTable<'_> {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn column_names(&self) -> Vec<String> {
        self.def.column_names()
    }

    fn open(&self) -> Result<Box<dyn Data + '_>> {
        Ok(Box::new(JetTableData {
            scanner: self.scanner(),
        }))
    }
}

/// Streams a Jet table straight out of the scanner's holders.
pub struct JetTableData<'db> {
    scanner: SequentialScanner<'db>,
}

impl Data for JetTableData<'_> {
    fn next(&mut self) -> Result<bool> {
        self.scanner.advance()
    }

    fn get(&self, index: usize) -> Result<&Value> {
        let holder: &Holder = self
            .scanner
            .holders()
            .get(index)
            .ok_or(DatabaseError::ColumnIndexOutOfBounds { index })?;
        if !holder.is_valid() {
            return Err(not_positioned());
        }
        Ok(holder.get())
    }

    fn column_count(&self) -> usize {
        self.scanner.holders().len()
    }

    fn rewind(&mut self) -> Result<()> {
        self.scanner.reset()
    }
}

/// Rows held in memory, for callers that assemble tables themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    pub fn new(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(DatabaseError::config(format!(
                "table '{}' has {} columns, row has {} values",
                name,
                columns.len(),
                bad.len()
            )));
        }
        Ok(Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }
}

impl TableSource for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn open(&self) -> Result<Box<dyn Data + '_>> {
        Ok(Box::new(MemoryData::new(self.columns.len(), self.rows.clone())?))
    }
}
