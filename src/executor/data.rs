use crate::types::{
    error::{DatabaseError, Result},
    value::Value,
};

/// Pull cursor over rows.
///
/// `next` advances to the following row and reports whether one exists;
/// `get` reads a column of the current row. Reading before the first `next`
/// or after exhaustion is an error.
pub trait Data {
    fn next(&mut self) -> Result<bool>;
    fn get(&self, index: usize) -> Result<&Value>;
    fn column_count(&self) -> usize;
    /// Restarts the cursor before its first row.
    fn rewind(&mut self) -> Result<()>;
}

/// Column access used by expression evaluation.
pub trait Columns {
    fn column(&self, index: usize) -> Result<&Value>;
}

impl Columns for dyn Data + '_ {
    fn column(&self, index: usize) -> Result<&Value> {
        self.get(index)
    }
}

impl Columns for [Value] {
    fn column(&self, index: usize) -> Result<&Value> {
        self.get(index)
            .ok_or(DatabaseError::ColumnIndexOutOfBounds { index })
    }
}

pub(crate) fn not_positioned() -> DatabaseError {
    DatabaseError::ExecutionError {
        details: "cursor is not positioned on a row".to_string(),
    }
}

/// Materialized rows, produced by aggregation and sorting.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryData {
    width: usize,
    rows: Vec<Vec<Value>>,
    position: Option<usize>,
}

impl MemoryData {
    pub fn new(width: usize, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(DatabaseError::config(format!(
                "row of {} values in a {}-column result",
                bad.len(),
                width
            )));
        }
        Ok(Self {
            width,
            rows,
            position: None,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }
}

impl Data for MemoryData {
    fn next(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next.min(self.rows.len()));
        Ok(next < self.rows.len())
    }

    fn get(&self, index: usize) -> Result<&Value> {
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(not_positioned)?;
        row.get(index)
            .ok_or(DatabaseError::ColumnIndexOutOfBounds { index })
    }

    fn column_count(&self) -> usize {
        self.width
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = None;
        Ok(())
    }
}

/// Copies the current row out of a cursor.
pub fn snapshot_row(data: &dyn Data) -> Result<Vec<Value>> {
    (0..data.column_count())
        .map(|i| data.get(i).cloned())
        .collect()
}

/// Drains a cursor into owned rows.
pub fn collect_rows(data: &mut dyn Data) -> Result<Vec<Vec<Value>>> {
    let mut rows = Vec::new();
    while data.next()? {
        rows.push(snapshot_row(data)?);
    }
    Ok(rows)
}

/// Adapts a cursor into an iterator of owned rows.
pub struct DataIterator<'a> {
    data: Box<dyn Data + 'a>,
    done: bool,
}

impl<'a> DataIterator<'a> {
    pub fn new(data: Box<dyn Data + 'a>) -> Self {
        Self { data, done: false }
    }
}

impl Iterator for DataIterator<'_> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.data.next() {
            Ok(true) => Some(snapshot_row(self.data.as_ref())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
