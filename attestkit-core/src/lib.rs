//! `attestkit-core` manages a hardware-backed device attestation key and signs
//! outgoing requests with it so a remote verifier can trust their origin.
//!
//! The entry point is [`AttestationKeyManager`]. Hardware access and durable
//! storage are supplied by the host app through the [`AttestationProvider`]
//! and [`KeyStore`] foreign traits.
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod config;
pub use config::*;

mod error;
pub use error::*;

pub mod hash_codec;

pub mod logger;

mod manager;
pub use manager::{
    AttestationKeyManager, LifecycleOperation, ManagerState, ATTESTATION_NONCE_FIELD,
};

pub mod protocol;

mod provider;
pub use provider::*;

pub mod storage;
pub use storage::{KeyStore, StorageError, StorageResult};

mod types;
pub use types::*;

// private modules
mod client_id;
mod http_request;

uniffi::setup_scaffolding!("attestkit_core");
