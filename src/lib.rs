pub mod config;
pub mod executor;
pub mod functions;
pub mod planner;
pub mod storage;
pub mod types;
pub mod utils;

pub use config::ReaderConfig;
pub use executor::{data::Data, engine::Engine};
pub use storage::database::Database;
pub use types::{
    error::{DatabaseError, Result},
    value::Value,
};
