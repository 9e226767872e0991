//! Key-value store errors.

use shared_types::StorageError;
use thiserror::Error;

/// Errors raised by [`crate::ports::KeyValueStore`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {0}")]
    Io(String),

    /// Stored bytes are not in the expected format.
    #[error("KV store corruption: {0}")]
    Corruption(String),

    /// The requested backend is not compiled in.
    #[error("storage backend {0} is not available in this build")]
    BackendUnavailable(String),
}

impl From<KvError> for StorageError {
    fn from(err: KvError) -> Self {
        match err {
            KvError::Corruption(message) => StorageError::DataCorruption(message),
            other => StorageError::DatabaseError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for KvError {
    fn from(e: std::io::Error) -> Self {
        KvError::Io(e.to_string())
    }
}
