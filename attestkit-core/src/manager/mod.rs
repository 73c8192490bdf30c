//! The attestation key manager: owns the device attestation key and drives
//! its lifecycle against the hardware, the key store and the verifier.
//!
//! Lifecycle operations run one at a time. Each one either commits exactly
//! one state transition at its end or leaves memory and the key store as
//! they were.

use std::future::Future;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError, RwLock,
};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use crate::{
    client_id::ClientId,
    config::AttestationConfig,
    error::AttestKitError,
    hash_codec,
    protocol::AttestationProtocolClient,
    provider::{AttestationProvider, ProviderError},
    storage::{KeyStore, StorageError, KEY_ID_KEY},
    types::{AttestationBlob, AttestedResponse, CorrelationId, KeyId},
};

mod state;
pub use state::{LifecycleOperation, ManagerState};


/// Body field carrying the nonce of an attested request.
pub const ATTESTATION_NONCE_FIELD: &str = "attestationNonce";

/// What `initialize()` learned about the device.
#[derive(Debug, Clone, Copy)]
struct Capabilities {
    supported: bool,
}

/// Outcome of the last failed `initialize()` attempt.
#[derive(Debug, Default)]
struct InitAttempts {
    failed: u64,
    last_error: Option<AttestKitError>,
}

/// Manages the device attestation key and signs requests with it.
#[derive(uniffi::Object)]
pub struct AttestationKeyManager {
    provider: Arc<dyn AttestationProvider>,
    key_store: Arc<dyn KeyStore>,
    protocol: AttestationProtocolClient,
    step_timeout: Option<Duration>,
    capabilities: OnceCell<Capabilities>,
    init_attempts: tokio::sync::Mutex<InitAttempts>,
    failed_inits: AtomicU64,
    state: RwLock<ManagerState>,
    in_flight: Mutex<Option<LifecycleOperation>>,
    serial: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for AttestationKeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationKeyManager")
            .field("state", &self.state())
            .field("in_flight", &self.in_flight_operation())
            .finish_non_exhaustive()
    }
}

/// Marks a lifecycle operation as running and keeps others queued until dropped.
struct OperationGuard<'a> {
    in_flight: &'a Mutex<Option<LifecycleOperation>>,
    _serial: tokio::sync::MutexGuard<'a, ()>,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        *self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[uniffi::export]
impl AttestationKeyManager {
    /// Creates a manager talking to the verifier described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    #[uniffi::constructor]
    pub fn new(
        provider: Arc<dyn AttestationProvider>,
        key_store: Arc<dyn KeyStore>,
        config: AttestationConfig,
    ) -> Result<Self, AttestKitError> {
        config.validate()?;
        let client_id = Arc::new(ClientId::new(Arc::clone(&key_store)));
        Ok(Self {
            provider,
            key_store,
            protocol: AttestationProtocolClient::new(&config, client_id),
            step_timeout: config.step_timeout(),
            capabilities: OnceCell::new(),
            init_attempts: tokio::sync::Mutex::default(),
            failed_inits: AtomicU64::new(0),
            state: RwLock::new(ManagerState::Uninitialized),
            in_flight: Mutex::new(None),
            serial: tokio::sync::Mutex::new(()),
        })
    }

    /// Whether the device supports hardware attestation.
    ///
    /// # Errors
    ///
    /// Returns [`AttestKitError::NotInitialized`] before `initialize()` completed.
    pub fn attestation_supported(&self) -> Result<bool, AttestKitError> {
        Ok(self.capabilities()?.supported)
    }

    /// Whether an attestation key is registered.
    ///
    /// # Errors
    ///
    /// Returns [`AttestKitError::NotInitialized`] before `initialize()` completed.
    pub fn is_key_registered(&self) -> Result<bool, AttestKitError> {
        self.capabilities()?;
        Ok(self.state().key_id().is_some())
    }

    /// Operations the current state allows; useful for enabling UI controls.
    ///
    /// # Errors
    ///
    /// Returns [`AttestKitError::NotInitialized`] before `initialize()` completed.
    pub fn available_operations(&self) -> Result<Vec<LifecycleOperation>, AttestKitError> {
        let supported = self.capabilities()?.supported;
        Ok(self
            .state()
            .available_operations()
            .into_iter()
            .filter(|operation| supported || *operation == LifecycleOperation::Delete)
            .collect())
    }

    /// The lifecycle operation currently running, if any.
    #[must_use]
    pub fn in_flight_operation(&self) -> Option<LifecycleOperation> {
        *self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl AttestationKeyManager {
    /// Probes hardware support and loads the persisted key id.
    ///
    /// Idempotent. Callers arriving while a load runs share its outcome,
    /// success or failure. A failed load is not cached: a call made after it
    /// settled starts a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the key store cannot be read or a step times out.
    pub async fn initialize(&self) -> Result<(), AttestKitError> {
        if self.capabilities.initialized() {
            return Ok(());
        }
        let seen_failures = self.failed_inits.load(Ordering::Acquire);
        let mut attempts = self.init_attempts.lock().await;
        if self.capabilities.initialized() {
            return Ok(());
        }
        // An attempt failed while this caller was waiting for it.
        if attempts.failed != seen_failures {
            if let Some(error) = &attempts.last_error {
                return Err(error.clone());
            }
        }

        match self.capabilities.get_or_try_init(|| self.load()).await {
            Ok(_) => {
                attempts.last_error = None;
                Ok(())
            }
            Err(error) => {
                attempts.failed += 1;
                attempts.last_error = Some(error.clone());
                self.failed_inits.store(attempts.failed, Ordering::Release);
                Err(error)
            }
        }
    }

    /// Generates a hardware key, attests it over a verifier nonce and
    /// registers it. The key becomes active only after the verifier
    /// acknowledged it and its id was persisted.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the manager is not initialized, the
    /// device is unsupported or a key is already registered. Returns
    /// [`AttestKitError::NonceUnavailable`] or
    /// [`AttestKitError::RegistrationRejected`] when the verifier fails, and
    /// provider, storage or timeout errors from the respective steps. In
    /// every failure case no key is persisted.
    pub async fn prepare_and_register_key(&self) -> Result<(), AttestKitError> {
        let _operation = self.begin(LifecycleOperation::Prepare).await?;

        log::info!("generating attestation key");
        let key_id = KeyId::new(self.step("generate_key", self.provider.generate_key()).await?)
            .map_err(|_| ProviderError::InvalidOutput("empty key identifier".to_string()))?;

        let correlation_id = CorrelationId::generate();
        let nonce = self
            .step("request_nonce", async {
                self.protocol
                    .request_nonce(&correlation_id)
                    .await
                    .ok_or(AttestKitError::NonceUnavailable)
            })
            .await?;
        let challenge = hash_codec::challenge_digest(&nonce);

        let attestation = AttestationBlob::new(
            self.step(
                "attest_key",
                self.provider
                    .attest_key(key_id.to_string(), challenge.to_base64()),
            )
            .await?,
        );
        log::debug!("attestation length: {}", attestation.as_str().len());

        let registered = self
            .step("register_key", async {
                Ok::<_, AttestKitError>(
                    self.protocol
                        .register_key(&correlation_id, &key_id, &attestation)
                        .await,
                )
            })
            .await?;
        if !registered {
            return Err(AttestKitError::RegistrationRejected);
        }

        self.persist_key_id(&key_id).await?;
        self.commit(ManagerState::KeyActive(key_id));
        log::info!("attestation key registered");
        Ok(())
    }

    /// Sends `body` (a JSON object) to `path` as an attested request.
    ///
    /// A fresh nonce is fetched for every call and added to the body as
    /// `attestationNonce`. The canonical form of the resulting body is signed
    /// with the active key and sent as-is.
    ///
    /// # Errors
    ///
    /// Returns [`AttestKitError::InvalidInput`] if `body` is not a JSON object
    /// or `path` is empty, a precondition error if no key is active, and
    /// transport, provider or timeout errors from the respective steps.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn make_attested_request(
        &self,
        path: String,
        body: String,
    ) -> Result<AttestedResponse, AttestKitError> {
        let body = match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(AttestKitError::InvalidInput {
                    attribute: "body".to_string(),
                    reason: "expected a JSON object".to_string(),
                })
            }
            Err(e) => {
                return Err(AttestKitError::InvalidInput {
                    attribute: "body".to_string(),
                    reason: e.to_string(),
                })
            }
        };
        self.make_attested_json_request(&path, body).await
    }

    /// Forgets the active key. Local only: the verifier is not contacted.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if no key is active, or a storage error if
    /// the key store could not remove the key id; in that case the key stays
    /// active.
    pub async fn delete_key(&self) -> Result<(), AttestKitError> {
        let _operation = self.begin(LifecycleOperation::Delete).await?;

        self.step("remove_key_id", self.key_store.remove(KEY_ID_KEY.to_string()))
            .await?;
        self.commit(ManagerState::NoKey);
        log::info!("attestation key deleted");
        Ok(())
    }
}

impl AttestationKeyManager {
    /// Returns a snapshot of the lifecycle state.
    #[must_use]
    pub fn state(&self) -> ManagerState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Like [`Self::make_attested_request`], for callers holding a parsed body.
    ///
    /// # Errors
    ///
    /// See [`Self::make_attested_request`].
    pub async fn make_attested_json_request(
        &self,
        path: &str,
        mut body: Map<String, Value>,
    ) -> Result<AttestedResponse, AttestKitError> {
        let _operation = self.begin(LifecycleOperation::Request).await?;
        if path.trim_matches('/').is_empty() {
            return Err(AttestKitError::InvalidInput {
                attribute: "path".to_string(),
                reason: "path is empty".to_string(),
            });
        }
        let key_id = self
            .state()
            .key_id()
            .cloned()
            .ok_or(AttestKitError::NoActiveKey)?;

        let correlation_id = CorrelationId::generate();
        let nonce = self
            .step("request_nonce", async {
                self.protocol
                    .request_nonce(&correlation_id)
                    .await
                    .ok_or(AttestKitError::NonceUnavailable)
            })
            .await?;

        body.insert(
            ATTESTATION_NONCE_FIELD.to_string(),
            Value::String(nonce.into_inner()),
        );
        let canonical = hash_codec::canonicalize(&Value::Object(body))?;
        let request_digest = hash_codec::digest(&canonical);

        let attestation = AttestationBlob::new(
            self.step(
                "sign_request_digest",
                self.provider
                    .sign_request_digest(request_digest.to_base64(), key_id.to_string()),
            )
            .await?,
        );

        self.step("send_attested_request", async {
            self.protocol
                .send_attested_request(path, canonical, &correlation_id, &attestation)
                .await
                .ok_or(AttestKitError::AttestedRequestFailed)
        })
        .await
    }

    fn capabilities(&self) -> Result<Capabilities, AttestKitError> {
        self.capabilities
            .get()
            .copied()
            .ok_or(AttestKitError::NotInitialized)
    }

    async fn load(&self) -> Result<Capabilities, AttestKitError> {
        let supported = self
            .step("is_supported", async {
                Ok::<_, AttestKitError>(self.provider.is_supported().await)
            })
            .await?;
        let stored = self
            .step("read_key_id", self.key_store.get(KEY_ID_KEY.to_string()))
            .await?;
        let key_id = stored
            .map(|bytes| {
                String::from_utf8(bytes)
                    .ok()
                    .and_then(|value| KeyId::new(value).ok())
                    .ok_or_else(|| StorageError::CorruptedEntry(KEY_ID_KEY.to_string()))
            })
            .transpose()?;

        log::info!(
            "attestation supported: {supported}, key registered: {}",
            key_id.is_some()
        );
        self.commit(ManagerState::from_stored(key_id));
        Ok(Capabilities { supported })
    }

    /// Waits for any running operation, then checks `operation` may start.
    async fn begin(
        &self,
        operation: LifecycleOperation,
    ) -> Result<OperationGuard<'_>, AttestKitError> {
        let capabilities = self.capabilities()?;
        // Deleting is local, every other operation needs the hardware.
        if !capabilities.supported && operation != LifecycleOperation::Delete {
            return Err(AttestKitError::AttestationUnsupported);
        }

        let serial = self.serial.lock().await;
        self.state().permits(operation)?;
        *self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(operation);
        Ok(OperationGuard {
            in_flight: &self.in_flight,
            _serial: serial,
        })
    }

    /// Persists the key id, removing it again if the write did not succeed
    /// within the step, so the key store never holds an uncommitted key.
    async fn persist_key_id(&self, key_id: &KeyId) -> Result<(), AttestKitError> {
        let result = self
            .step(
                "persist_key_id",
                self.key_store
                    .put(KEY_ID_KEY.to_string(), key_id.as_str().as_bytes().to_vec()),
            )
            .await;
        if result.is_err() {
            if let Err(e) = self.key_store.remove(KEY_ID_KEY.to_string()).await {
                log::error!("failed to roll back key id after failed persist: {e}");
            }
        }
        result
    }

    fn commit(&self, state: ManagerState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    async fn step<T, E>(
        &self,
        step: &'static str,
        future: impl Future<Output = Result<T, E>>,
    ) -> Result<T, AttestKitError>
    where
        AttestKitError: From<E>,
    {
        let result = match self.step_timeout {
            Some(limit) => tokio::time::timeout(limit, future)
                .await
                .map_err(|_| AttestKitError::Timeout {
                    step: step.to_string(),
                })?,
            None => future.await,
        };
        result.map_err(|e| {
            let error = AttestKitError::from(e);
            log::warn!("{step} failed: {error}");
            error
        })
    }
}
