//! Error types for filevault.

use thiserror::Error;

/// Common error type for filevault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Malformed request: missing multipart part, oversize body, bad parameter.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or invalid credentials.
    #[error("authentication error: {0}")]
    Unauthorized(String),

    /// The owner referenced by an upload does not exist.
    #[error("owner {0} not found")]
    OwnerNotFound(i64),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Unique constraint conflict (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Blob store failure.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// Metadata store failure.
    ///
    /// Errors from sqlx are automatically converted.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// Cache backend failure.
    #[error("cache error: {0}")]
    Cache(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for VaultError {
    fn from(e: sqlx::Error) -> Self {
        VaultError::PersistenceFailure(e.to_string())
    }
}

impl From<redis::RedisError> for VaultError {
    fn from(e: redis::RedisError) -> Self {
        VaultError::Cache(e.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Cache(format!("serialization: {e}"))
    }
}

/// Result type alias for filevault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
