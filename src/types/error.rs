use thiserror::Error;

use crate::types::PageId;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupted page: page_id={page_id}, reason={reason}")]
    CorruptPage { page_id: PageId, reason: String },

    #[error("Corrupted catalog: {reason}")]
    CorruptCatalog { reason: String },

    #[error("Cannot decode row {row} on page {page_id}: {reason}")]
    RowDecode {
        page_id: PageId,
        row: usize,
        reason: String,
    },

    #[error("Type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid query configuration: {details}")]
    Config { details: String },

    #[error("Table '{name}' not found")]
    TableNotFound { name: String },

    #[error("Column index {index} out of bounds")]
    ColumnIndexOutOfBounds { index: usize },

    #[error("Query execution error: {details}")]
    ExecutionError { details: String },

    #[error("Invalid page type: {0}")]
    InvalidPageType(u8),

    #[error("Unsupported database format: {version}")]
    UnsupportedFormat { version: String },

    #[error("Database handle is closed")]
    Closed,
}

impl DatabaseError {
    /// Row-level decode failures are the only errors a scan may skip past.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DatabaseError::RowDecode { .. })
    }

    pub fn config(details: impl Into<String>) -> Self {
        DatabaseError::Config {
            details: details.into(),
        }
    }

    pub fn type_mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        DatabaseError::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn corrupt_page(page_id: PageId, reason: impl Into<String>) -> Self {
        DatabaseError::CorruptPage {
            page_id,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
