use jetdb::{
    storage::schema::{ColumnDef, ColumnType},
    types::value::Value,
    utils::fixture::TableBuilder,
};

#[derive(Debug, Clone, Copy)]
pub enum RowType {
    Small,
    Medium,
    Large,
}

pub struct DataGenerator {
    seed: u64,
}

impl DataGenerator {
    pub fn new() -> Self {
        Self { seed: 42 }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// Table definition matching the rows `generate_row` produces.
    pub fn table(&self, name: &str, row_type: RowType) -> TableBuilder {
        let table = TableBuilder::new(name).column(ColumnDef::new("id", ColumnType::LongInt));
        match row_type {
            RowType::Small => table.column(ColumnDef::new("name", ColumnType::Text).compressed()),
            RowType::Medium => table
                .column(ColumnDef::new("name", ColumnType::Text).compressed())
                .column(ColumnDef::new("score", ColumnType::Double))
                .column(ColumnDef::new("active", ColumnType::Bool))
                .column(ColumnDef::new("bucket", ColumnType::Int)),
            RowType::Large => table
                .column(ColumnDef::new("description", ColumnType::Memo).compressed())
                .column(ColumnDef::new("data", ColumnType::Binary))
                .column(ColumnDef::new("metadata", ColumnType::Text)),
        }
    }

    pub fn generate_row(&self, id: i32, row_type: RowType) -> Vec<Value> {
        match row_type {
            RowType::Small => self.generate_small_row(id),
            RowType::Medium => self.generate_medium_row(id),
            RowType::Large => self.generate_large_row(id),
        }
    }

    fn generate_small_row(&self, id: i32) -> Vec<Value> {
        vec![Value::Int(id), Value::from("short")]
    }

    fn generate_medium_row(&self, id: i32) -> Vec<Value> {
        vec![
            Value::Int(id),
            Value::Text(format!("user_name_{}", id)),
            Value::Double(id as f64 * 1.5 + 0.1),
            Value::Bool(id % 2 == 0),
            Value::Int(((id as u64).wrapping_mul(self.seed | 1) % 16) as i32),
        ]
    }

    fn generate_large_row(&self, id: i32) -> Vec<Value> {
        let large_text = format!(
            "This is a large text field for row {} containing substantial data to test performance with larger row sizes. {}",
            id,
            "x".repeat(400)
        );
        let blob_data: Vec<u8> = (0..200).map(|i| ((id as i64 + i) % 256) as u8).collect();
        let metadata = format!(
            "{{\"id\":{},\"timestamp\":{},\"tags\":[\"row_{}\"]}}",
            id,
            1640995200 + id as i64,
            id
        );
        vec![
            Value::Int(id),
            Value::Text(large_text),
            Value::Binary(blob_data),
            Value::Text(metadata),
        ]
    }

    pub fn generate_rows(&self, count: usize, row_type: RowType) -> Vec<Vec<Value>> {
        (1..=count as i32)
            .map(|i| self.generate_row(i, row_type))
            .collect()
    }

    /// A table of `count` generated rows, ready to add to an image.
    pub fn populated_table(&self, name: &str, count: usize, row_type: RowType) -> TableBuilder {
        self.table(name, row_type)
            .rows(self.generate_rows(count, row_type))
    }
}

impl Default for DataGenerator {
    fn default() -> Self {
        Self::new()
    }
}
