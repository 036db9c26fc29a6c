use crate::types::{error::Result, row::Row};

/// Row-at-a-time access to a table's stored rows.
///
/// Implementors only move a cursor (`advance`) and expose the row it sits
/// on; owned `Row` snapshots and batches are built on top of that.
pub trait Scanner {
    /// Moves to the next live row. Returns false once exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Copies out the row the cursor sits on, if any.
    fn current_row(&self) -> Option<Row>;

    /// Restarts the scan before its first row.
    fn reset(&mut self) -> Result<()>;

    fn scan(&mut self) -> Result<Option<Row>> {
        Ok(if self.advance()? { self.current_row() } else { None })
    }

    fn scan_batch(&mut self, batch_size: usize) -> Result<Vec<Row>> {
        let mut rows = Vec::with_capacity(batch_size);
        while rows.len() < batch_size {
            let Some(row) = self.scan()? else { break };
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Adapts a `Scanner` into an iterator of owned rows.
pub struct ScanIterator<S: Scanner> {
    scanner: S,
}

impl<S: Scanner> ScanIterator<S> {
    pub fn new(scanner: S) -> Self {
        Self { scanner }
    }

    pub fn into_inner(self) -> S {
        self.scanner
    }
}

impl<S: Scanner> Iterator for ScanIterator<S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.scanner.scan().transpose()
    }
}
