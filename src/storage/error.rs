//! Storage layer error types.

use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The page id does not belong to the file or lies past its end.
    #[error("Invalid page {pid}: {reason}")]
    InvalidPage { pid: PageId, reason: String },

    #[error("Failed to read page {pid}: {source}")]
    ReadFailure {
        pid: PageId,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write page {pid}: {source}")]
    WriteFailure {
        pid: PageId,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },

    /// Requested the next tuple when none remains.
    #[error("No such element")]
    NoSuchElement,

    #[error("Page not found: {0}")]
    PageNotFound(PageId),

    #[error("Tuple not found: {0}")]
    TupleNotFound(String),

    #[error("Page {pid} is full: no empty slot among {num_slots}")]
    PageFull { pid: PageId, num_slots: usize },

    /// Not even one tuple of this size fits on a page.
    #[error("Tuple of {size} bytes does not fit in a page")]
    TupleTooLarge { size: usize },

    #[error("Buffer pool is full: all {capacity} cached pages are dirty or pinned")]
    BufferPoolFull { capacity: usize },

    #[error("Transaction {0} aborted")]
    TransactionAborted(TransactionId),

    #[error("Length mismatch: {types} types but {names} names")]
    LengthMismatch { types: usize, names: usize },

    #[error("A tuple descriptor needs at least one field")]
    EmptySchema,

    #[error("No field at index {index} (num fields: {num_fields})")]
    NoSuchField { index: usize, num_fields: usize },

    #[error("No field named {0:?}")]
    FieldNotFound(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
