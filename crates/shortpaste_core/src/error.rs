//! Application error types for core storage and domain logic.
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a [`crate::storage::StorageBackend`].
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Key '{0}' already exists")]
    AlreadyExists(String),

    #[error("Document '{0}' not found")]
    NotFound(String),

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Storage error: {0}")]
    Message(String),
}

impl From<redb::DatabaseError> for StorageError {
    fn from(value: redb::DatabaseError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(value: redb::TransactionError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TableError> for StorageError {
    fn from(value: redb::TableError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(value: redb::StorageError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(value: redb::CommitError) -> Self {
        Self::Database(value.into())
    }
}

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Rate limit exceeded, retry in {}s", .retry_after.as_secs().max(1))]
    RateLimitExceeded { retry_after: Duration },

    #[error("This URL is already in use, please choose a different one")]
    KeyConflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Storage did not respond within {}ms", .0.as_millis())]
    StorageTimeout(Duration),

    #[error("No free key found after {attempts} attempts")]
    KeySpaceExhausted { attempts: usize },

    #[error("Document not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal,
}
