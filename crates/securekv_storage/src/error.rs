//! Error types for preferences storage.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted document could not be serialized or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The persisted store is unreadable.
    #[error("store '{name}' corrupted: {message}")]
    Corrupted {
        /// Physical store name.
        name: String,
        /// Description of the corruption.
        message: String,
    },
}

impl StorageError {
    /// Creates a corruption error for the named store.
    pub fn corrupted(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupted {
            name: name.into(),
            message: message.into(),
        }
    }
}
