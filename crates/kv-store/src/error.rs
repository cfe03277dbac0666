//! Error types for key-value operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for key-value operations
pub type Result<T> = std::result::Result<T, KvError>;

/// Errors that can occur while reading or writing the backend
#[derive(Debug, Error)]
pub enum KvError {
    /// Key cannot be stored by this backend
    #[error("Invalid key: '{key}'")]
    InvalidKey { key: String },

    /// Reading a stored value failed
    #[error("Failed to read '{key}' from {path}")]
    ReadFailed {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a value failed
    #[error("Failed to write '{key}' to {path}")]
    WriteFailed {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Removing a value failed
    #[error("Failed to remove '{key}' at {path}")]
    RemoveFailed {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backend refused the operation
    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },
}

impl KvError {
    /// Create an Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}
