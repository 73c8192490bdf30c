//! Lifecycle state of the attestation key.

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{error::AttestKitError, types::KeyId};

/// Durable state of the attestation key, as mirrored in the key store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ManagerState {
    /// `initialize()` has not completed yet.
    #[default]
    Uninitialized,
    /// No key is registered; neither memory nor the key store holds a key id.
    NoKey,
    /// A registered key is held in memory and persisted in the key store.
    KeyActive(KeyId),
}

/// Operations that drive the key lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleOperation {
    /// Generate, attest and register a new key.
    Prepare,
    /// Sign and send a request with the active key.
    Request,
    /// Forget the active key.
    Delete,
}

impl ManagerState {
    pub(crate) fn from_stored(key_id: Option<KeyId>) -> Self {
        key_id.map_or(Self::NoKey, Self::KeyActive)
    }

    /// Returns the active key, if any.
    #[must_use]
    pub const fn key_id(&self) -> Option<&KeyId> {
        match self {
            Self::KeyActive(key_id) => Some(key_id),
            Self::Uninitialized | Self::NoKey => None,
        }
    }

    /// Checks that `operation` may start from this state.
    ///
    /// # Errors
    ///
    /// Returns the precondition error describing why it may not.
    pub fn permits(&self, operation: LifecycleOperation) -> Result<(), AttestKitError> {
        match (self, operation) {
            (Self::Uninitialized, _) => Err(AttestKitError::NotInitialized),
            (Self::NoKey, LifecycleOperation::Prepare)
            | (Self::KeyActive(_), LifecycleOperation::Request | LifecycleOperation::Delete) => {
                Ok(())
            }
            (Self::NoKey, _) => Err(AttestKitError::NoActiveKey),
            (Self::KeyActive(_), LifecycleOperation::Prepare) => {
                Err(AttestKitError::KeyAlreadyRegistered)
            }
        }
    }

    /// Operations this state allows, in declaration order.
    #[must_use]
    pub fn available_operations(&self) -> Vec<LifecycleOperation> {
        LifecycleOperation::iter()
            .filter(|operation| self.permits(*operation).is_ok())
            .collect()
    }
}
