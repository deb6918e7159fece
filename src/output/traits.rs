//! Output traits and error types
//!
//! This module defines the trait interface for record stores and the errors
//! raised while writing output.

use crate::crawler::ProductRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to replace output file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for durable record storage
///
/// A call to `append_records` must be all-or-nothing: either every record in the
/// batch becomes durable, or the store is left exactly as it was.
pub trait RecordStore {
    /// Appends a batch of records after everything written so far
    ///
    /// # Returns
    ///
    /// The number of records written
    fn append_records(&mut self, records: &[ProductRecord]) -> OutputResult<usize>;

    /// Human-readable location of the store (for logs)
    fn location(&self) -> String;
}
