//! Hardware attestation capability supplied by the host app.
//!
//! On iOS this is backed by `DCAppAttestService`; on Android by Key
//! Attestation in the hardware keystore. The core only threads digests in and
//! attestation blobs out; it never inspects what the hardware produces. All
//! binary payloads cross this boundary base64-encoded.

use thiserror::Error;

/// Errors raised by an [`AttestationProvider`].
#[derive(Debug, Clone, Error, uniffi::Error)]
pub enum ProviderError {
    /// The device does not support hardware attestation.
    #[error("attestation unsupported")]
    Unsupported,

    /// The hardware refused or failed the operation.
    #[error("hardware error: {0}")]
    Hardware(String),

    /// The requested key is unknown to the hardware (for example, wiped by a
    /// device restore).
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// The provider returned a value the core cannot use.
    #[error("invalid provider output: {0}")]
    InvalidOutput(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for ProviderError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

/// Secure-hardware attestation capability.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait AttestationProvider: Send + Sync {
    /// Whether this device can generate and attest hardware keys.
    async fn is_supported(&self) -> bool;

    /// Generates a new hardware-bound key pair and returns its opaque identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware cannot create a key.
    async fn generate_key(&self) -> Result<String, ProviderError>;

    /// Attests `key_id` over the base64-encoded challenge digest and returns
    /// the base64-encoded attestation object.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or attestation fails.
    async fn attest_key(
        &self,
        key_id: String,
        challenge_digest_base64: String,
    ) -> Result<String, ProviderError>;

    /// Signs the base64-encoded request digest with `key_id` and returns the
    /// base64-encoded assertion.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or signing fails.
    async fn sign_request_digest(
        &self,
        data_digest_base64: String,
        key_id: String,
    ) -> Result<String, ProviderError>;
}
