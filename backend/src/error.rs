//! Error handling for the weather record service
//!
//! Store operations report every failure mode as a typed variant the caller
//! can discriminate; nothing in the store path panics or leaks a raw database
//! error into a response body.

use thiserror::Error;

/// Failure modes of the record store
#[derive(Error, Debug)]
pub enum StoreError {
    /// An update payload named a field that is not mutable on a record
    #[error("Invalid key: {0}")]
    InvalidField(String),

    /// No record exists with the requested id
    #[error("weather record {0} not found")]
    NotFound(i32),

    /// A field value failed conversion or bounds checking
    #[error("invalid value for {field}: {message}")]
    Validation { field: String, message: String },

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
