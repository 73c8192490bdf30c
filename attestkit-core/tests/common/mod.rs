#![allow(dead_code)]

//! Host-side fakes shared across integration tests.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use attestkit_core::{AttestationProvider, KeyStore, ProviderError, StorageError, StorageResult};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Key store living in memory, shared between manager instances to simulate
/// an app restart.
#[derive(Default)]
pub struct MemoryKeyStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyStore {
    pub fn entry(&self, name: &str) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(name).cloned()
    }
}

#[async_trait::async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(&self, name: String) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap().get(&name).cloned())
    }

    async fn put(&self, name: String, value: Vec<u8>) -> StorageResult<()> {
        self.entries.lock().unwrap().insert(name, value);
        Ok(())
    }

    async fn remove(&self, name: String) -> StorageResult<()> {
        if name.is_empty() {
            return Err(StorageError::KeyStore("empty name".to_string()));
        }
        self.entries.lock().unwrap().remove(&name);
        Ok(())
    }
}

/// Provider producing `k1`, `k2`, ... and echoing the digests it receives,
/// so tests can check what the hardware was asked to attest or sign.
#[derive(Default)]
pub struct EchoProvider {
    keys: AtomicUsize,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl AttestationProvider for EchoProvider {
    async fn is_supported(&self) -> bool {
        true
    }

    async fn generate_key(&self) -> Result<String, ProviderError> {
        let n = self.keys.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().unwrap().push(format!("generate k{n}"));
        Ok(format!("k{n}"))
    }

    async fn attest_key(
        &self,
        key_id: String,
        challenge_digest_base64: String,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("attest {key_id} {challenge_digest_base64}"));
        Ok(format!("attestation:{challenge_digest_base64}"))
    }

    async fn sign_request_digest(
        &self,
        data_digest_base64: String,
        key_id: String,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("sign {key_id} {data_digest_base64}"));
        Ok(format!("assertion:{data_digest_base64}"))
    }
}
