pub mod catalog;
pub mod database;
pub mod format;
pub mod header;
pub mod long_value;
pub mod page_reader;
pub mod row_decoder;
pub mod row_offsets;
pub mod schema;
pub mod source;
pub mod text;
pub mod usage_map;
