pub mod aggregate;
pub mod data;
pub mod engine;
pub mod expr;
pub mod filter;
pub mod join;
pub mod project;
pub mod scan;
pub mod sequential_scan;
pub mod sort;
pub mod table_scan;
pub mod table_source;
pub mod task;
