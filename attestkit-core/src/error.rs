use thiserror::Error;

use crate::{provider::ProviderError, storage::StorageError};

/// Error outputs from `AttestKit`
#[derive(Debug, Clone, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum AttestKitError {
    /// An operation was invoked before `initialize()` completed.
    #[error("not_initialized")]
    NotInitialized,
    /// The device cannot produce hardware attestations.
    #[error("attestation_unsupported")]
    AttestationUnsupported,
    /// The operation requires a registered attestation key and there is none.
    #[error("no_active_key")]
    NoActiveKey,
    /// A key is already registered; delete it before registering another.
    #[error("key_already_registered")]
    KeyAlreadyRegistered,
    /// The presented input is not valid for the requested operation
    #[error("invalid_input_{attribute}: {reason}")]
    InvalidInput {
        /// The name of the offending input.
        attribute: String,
        /// Why the input was rejected.
        reason: String,
    },
    /// The verifier did not hand out a nonce for this operation.
    #[error("nonce_unavailable")]
    NonceUnavailable,
    /// The verifier did not acknowledge the key registration.
    #[error("registration_rejected")]
    RegistrationRejected,
    /// The attested request did not produce a well-formed response.
    #[error("attested_request_failed")]
    AttestedRequestFailed,
    /// Network connection error with details
    #[error("network_error: {url} (status: {status:?}): {error}")]
    NetworkError {
        /// The requested URL.
        url: String,
        /// The HTTP status, if a response was received.
        status: Option<u16>,
        /// Description of the failure.
        error: String,
    },
    /// A lifecycle step exceeded the configured step timeout.
    #[error("timeout: {step}")]
    Timeout {
        /// The step that timed out.
        step: String,
    },
    /// Unexpected error serializing information
    #[error("serialization_error: {error}")]
    SerializationError {
        /// Description of the failure.
        error: String,
    },
    /// Failure reported by the key store.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Failure reported by the attestation provider.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Broad classification of an [`AttestKitError`], used by callers to decide
/// how to react to a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum ErrorClass {
    /// The operation was called in a state that does not allow it. Retrying
    /// without changing the call sequence will fail again.
    Precondition,
    /// A remote round-trip failed. Retrying starts over with a fresh
    /// correlation id.
    Transport,
    /// The key store failed to read or write.
    Storage,
    /// The attestation hardware failed.
    Hardware,
    /// Anything else.
    Internal,
}

impl AttestKitError {
    /// Returns the class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotInitialized
            | Self::AttestationUnsupported
            | Self::NoActiveKey
            | Self::KeyAlreadyRegistered
            | Self::InvalidInput { .. } => ErrorClass::Precondition,
            Self::NonceUnavailable
            | Self::RegistrationRejected
            | Self::AttestedRequestFailed
            | Self::NetworkError { .. }
            | Self::Timeout { .. } => ErrorClass::Transport,
            Self::Storage(_) => ErrorClass::Storage,
            Self::Provider(_) => ErrorClass::Hardware,
            Self::SerializationError { .. } => ErrorClass::Internal,
        }
    }

    /// Whether the caller may retry the failed operation as-is.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Transport | ErrorClass::Storage | ErrorClass::Hardware
        )
    }
}

impl From<reqwest::Error> for AttestKitError {
    fn from(error: reqwest::Error) -> Self {
        Self::NetworkError {
            url: error
                .url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            status: error.status().map(|status| status.as_u16()),
            error: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for AttestKitError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError {
            error: error.to_string(),
        }
    }
}
