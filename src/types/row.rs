use serde::{Deserialize, Serialize};

use crate::types::{PageId, RowId, error::DatabaseError, value::Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub row_id: Option<RowId>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            row_id: None,
            values,
        }
    }

    pub fn with_row_id(row_id: RowId, values: Vec<Value>) -> Self {
        Self {
            row_id: Some(row_id),
            values,
        }
    }

    /// Row ids of decoded rows pack the data page and the slot number.
    pub fn make_row_id(page_id: PageId, slot: usize) -> RowId {
        ((page_id as RowId) << 8) | (slot as RowId & 0xFF)
    }

    pub fn get_value(&self, column_index: usize) -> Option<&Value> {
        self.values.get(column_index)
    }

    pub fn set_value(&mut self, column_index: usize, value: Value) -> Result<(), DatabaseError> {
        if column_index >= self.values.len() {
            return Err(DatabaseError::ColumnIndexOutOfBounds {
                index: column_index,
            });
        }
        self.values[column_index] = value;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends the columns of `other`, as a join does when combining rows.
    pub fn concat(&self, other: &Row) -> Row {
        let mut values = Vec::with_capacity(self.values.len() + other.values.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&other.values);
        Row::new(values)
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::new(values)
    }
}
