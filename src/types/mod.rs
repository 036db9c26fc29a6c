pub mod error;
pub mod holder;
pub mod page;
pub mod row;
pub mod value;

// Common type aliases
pub type PageId = u32;
pub type RowId = u64;

pub const JET3_PAGE_SIZE: usize = 2048;
pub const JET4_PAGE_SIZE: usize = 4096;

// Table definition of the system catalog (MSysObjects) always lives here
pub const CATALOG_DEFINITION_PAGE: PageId = 2;
