//! Platform interface for durable storage.

use super::error::StorageResult;

/// String-keyed byte storage that survives process restarts.
///
/// Platform implementations typically use the Keychain on iOS and
/// `EncryptedSharedPreferences` on Android. Every method may suspend.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait KeyStore: Send + Sync {
    /// Reads the value stored under `name`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn get(&self, name: String) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `name`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn put(&self, name: String, value: Vec<u8>) -> StorageResult<()>;

    /// Removes the value stored under `name`. Removing a missing entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    async fn remove(&self, name: String) -> StorageResult<()>;
}
