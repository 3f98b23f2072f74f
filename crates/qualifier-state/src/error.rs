//! Error types for qualifier-state

use thiserror::Error;

/// Errors raised by a [`crate::ScanRepository`] backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The repository could not be reached or authenticated against.
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Query execution failed on the backend.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A row came back in a shape the adapter does not understand.
    #[error("Invalid {table} row: {reason}")]
    InvalidRow { table: &'static str, reason: String },

    /// Schema setup failed
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),

    /// Raw identifier could not be parsed into a typed value.
    #[error("Invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
