//! `AttestKit` binds a hardware attestation key to an app install and signs
//! outgoing requests with it. This crate re-exports `attestkit-core` and
//! carries the foreign bindings scaffolding.

pub use attestkit_core::*;

uniffi::setup_scaffolding!("attestkit");
