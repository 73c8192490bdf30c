//! Error types for key store implementations.

use thiserror::Error;

/// Result type for key store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the host app's key store.
#[derive(Debug, Clone, Error, uniffi::Error)]
pub enum StorageError {
    /// Errors coming from the underlying key store.
    #[error("key store error: {0}")]
    KeyStore(String),

    /// A stored value could not be decoded.
    #[error("corrupted entry {0}")]
    CorruptedEntry(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for StorageError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}
