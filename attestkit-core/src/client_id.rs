//! Stable per-install client identifier.
//!
//! The identifier is read from the key store, or generated and persisted on
//! first use. Concurrent first accesses join a single load; a failed load is
//! not cached, so the next access retries it.

use std::sync::Arc;

use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::storage::{KeyStore, StorageError, StorageResult, CLIENT_ID_KEY};

pub struct ClientId {
    key_store: Arc<dyn KeyStore>,
    value: OnceCell<String>,
}

impl ClientId {
    pub(crate) fn new(key_store: Arc<dyn KeyStore>) -> Self {
        Self {
            key_store,
            value: OnceCell::new(),
        }
    }

    /// Returns the client identifier, loading or creating it on first use.
    pub(crate) async fn get(&self) -> StorageResult<&str> {
        self.value
            .get_or_try_init(|| self.load_or_create())
            .await
            .map(String::as_str)
    }

    async fn load_or_create(&self) -> StorageResult<String> {
        if let Some(bytes) = self.key_store.get(CLIENT_ID_KEY.to_string()).await? {
            return String::from_utf8(bytes)
                .map_err(|_| StorageError::CorruptedEntry(CLIENT_ID_KEY.to_string()));
        }
        let client_id = Uuid::new_v4().to_string();
        self.key_store
            .put(CLIENT_ID_KEY.to_string(), client_id.clone().into_bytes())
            .await?;
        log::info!("generated new client id");
        Ok(client_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::storage::test_support::InMemoryKeyStore;

    #[tokio::test]
    async fn test_reuses_persisted_client_id() {
        let store = Arc::new(InMemoryKeyStore::with_entries(&[(
            CLIENT_ID_KEY,
            b"client-1".as_slice(),
        )]));
        let client_id = ClientId::new(store.clone());

        assert_eq!(client_id.get().await.unwrap(), "client-1");
        assert_eq!(client_id.get().await.unwrap(), "client-1");
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generates_and_persists_client_id() {
        let store = Arc::new(InMemoryKeyStore::new());
        let generated = ClientId::new(store.clone()).get().await.unwrap().to_string();

        assert_eq!(store.entry(CLIENT_ID_KEY), Some(generated.clone().into_bytes()));
        // A new process sees the same identifier.
        assert_eq!(ClientId::new(store).get().await.unwrap(), generated);
    }

    #[tokio::test]
    async fn test_failed_persist_is_not_cached() {
        let store = Arc::new(InMemoryKeyStore::new());
        store.fail_writes.store(true, Ordering::SeqCst);
        let client_id = ClientId::new(store.clone());

        assert!(client_id.get().await.is_err());

        store.fail_writes.store(false, Ordering::SeqCst);
        assert!(client_id.get().await.is_ok());
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_reported() {
        let store = Arc::new(InMemoryKeyStore::with_entries(&[(
            CLIENT_ID_KEY,
            [0xff, 0xfe].as_slice(),
        )]));
        assert!(matches!(
            ClientId::new(store).get().await,
            Err(StorageError::CorruptedEntry(_))
        ));
    }
}
