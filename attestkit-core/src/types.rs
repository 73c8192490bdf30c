use std::fmt;

use uuid::Uuid;

use crate::error::AttestKitError;

/// Opaque handle of one hardware attestation key. Never parsed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyId(String);

impl KeyId {
    /// Wraps an identifier returned by the attestation provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is empty.
    pub fn new(value: String) -> Result<Self, AttestKitError> {
        if value.is_empty() {
            return Err(AttestKitError::InvalidInput {
                attribute: "key_id".to_string(),
                reason: "key identifier is empty".to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyId").field(&self.0).finish()
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-operation identifier binding a nonce to the operation consuming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Mints a fresh random correlation id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single-use challenge issued by the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    pub(crate) const fn new(value: String) -> Self {
        Self(value)
    }

    /// Returns the nonce as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the nonce, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Base64-encoded attestation or assertion produced by the hardware.
#[derive(Clone, PartialEq, Eq)]
pub struct AttestationBlob(String);

impl AttestationBlob {
    pub(crate) const fn new(base64: String) -> Self {
        Self(base64)
    }

    /// Returns the base64 text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Blobs are only ever logged by size.
impl fmt::Debug for AttestationBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttestationBlob({} bytes)", self.0.len())
    }
}

/// Response of the verifier to an attested request.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct AttestedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as JSON text.
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_id_is_rejected() {
        assert!(matches!(
            KeyId::new(String::new()),
            Err(AttestKitError::InvalidInput { .. })
        ));
        assert_eq!(KeyId::new("k1".to_string()).unwrap().as_str(), "k1");
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let first = CorrelationId::generate();
        let second = CorrelationId::generate();
        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 36);
    }

    #[test]
    fn test_blob_debug_hides_contents() {
        let blob = AttestationBlob::new("c2VjcmV0".to_string());
        assert_eq!(format!("{blob:?}"), "AttestationBlob(8 bytes)");
    }
}
