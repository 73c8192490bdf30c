//! Durable key/value storage supplied by the host app.

pub mod error;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use traits::KeyStore;

/// Key store entry holding the identifier of the registered attestation key.
pub(crate) const KEY_ID_KEY: &str = "publicKeyId";

/// Key store entry holding the per-install client identifier.
pub(crate) const CLIENT_ID_KEY: &str = "clientId";
