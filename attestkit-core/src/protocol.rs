//! Client for the remote verifier.
//!
//! Every call is a JSON `POST` carrying the per-install client id
//! (`x-client-id`) and the operation's correlation id (`x-request-id`).
//! Attested calls also carry the hardware assertion (`x-client-attestation`).
//!
//! Failures never surface as errors here: they are logged and reported as an
//! absent result, and the caller decides whether to retry with a fresh
//! correlation id.

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    client_id::ClientId,
    config::AttestationConfig,
    error::AttestKitError,
    http_request::Request,
    types::{AttestationBlob, AttestedResponse, CorrelationId, KeyId, Nonce},
};

/// Endpoint issuing nonces bound to a correlation id.
pub const NONCE_ENDPOINT: &str = "newAttestationNonce";
/// Endpoint registering a freshly attested key.
pub const REGISTER_KEY_ENDPOINT: &str = "registerAppAttestKey";

/// Header carrying the per-install client id.
pub const CLIENT_ID_HEADER: &str = "x-client-id";
/// Header carrying the correlation id of the operation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Header carrying the base64 attestation of an attested request.
pub const CLIENT_ATTESTATION_HEADER: &str = "x-client-attestation";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NonceRequest<'a> {
    for_request_id: &'a str,
}

#[derive(Deserialize)]
struct NonceResponse {
    nonce: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterKeyRequest<'a> {
    key_id: &'a str,
    attestation_base64: &'a str,
}

/// Talks to the remote verifier on behalf of the key manager.
pub struct AttestationProtocolClient {
    base_url: String,
    request: Request,
    client_id: Arc<ClientId>,
}

impl AttestationProtocolClient {
    pub(crate) fn new(config: &AttestationConfig, client_id: Arc<ClientId>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request: Request::new(config),
            client_id,
        }
    }

    /// Requests a nonce bound to `correlation_id`.
    ///
    /// Returns `None` on transport failure, a non-success status, or a body
    /// without a string `nonce` field.
    pub async fn request_nonce(&self, correlation_id: &CorrelationId) -> Option<Nonce> {
        let body = serde_json::to_vec(&NonceRequest {
            for_request_id: correlation_id.as_str(),
        })
        .ok()?;
        let (_, value) = self
            .post(NONCE_ENDPOINT, body, correlation_id, None)
            .await
            .inspect_err(|e| log::warn!("nonce request {correlation_id} failed: {e}"))
            .ok()?;
        match serde_json::from_value::<NonceResponse>(value) {
            Ok(response) => Some(Nonce::new(response.nonce)),
            Err(e) => {
                log::warn!("nonce response for {correlation_id} is malformed: {e}");
                None
            }
        }
    }

    /// Registers `key_id` with its attestation. Returns `true` only when the
    /// verifier acknowledged the registration.
    pub async fn register_key(
        &self,
        correlation_id: &CorrelationId,
        key_id: &KeyId,
        attestation: &AttestationBlob,
    ) -> bool {
        let Ok(body) = serde_json::to_vec(&RegisterKeyRequest {
            key_id: key_id.as_str(),
            attestation_base64: attestation.as_str(),
        }) else {
            return false;
        };
        match self
            .post(REGISTER_KEY_ENDPOINT, body, correlation_id, None)
            .await
        {
            Ok((_, Value::Null)) => {
                log::warn!("key registration {correlation_id} returned an empty ack");
                false
            }
            Ok(_) => true,
            Err(e) => {
                log::warn!("key registration {correlation_id} failed: {e}");
                false
            }
        }
    }

    /// Sends an attested request. `body` must already be in canonical form
    /// and contain the nonce the attestation was computed over.
    ///
    /// Returns `None` on the same failures as [`Self::request_nonce`].
    pub async fn send_attested_request(
        &self,
        path: &str,
        body: Vec<u8>,
        correlation_id: &CorrelationId,
        attestation: &AttestationBlob,
    ) -> Option<AttestedResponse> {
        let (status, value) = self
            .post(path, body, correlation_id, Some(attestation))
            .await
            .inspect_err(|e| log::warn!("attested request {correlation_id} failed: {e}"))
            .ok()?;
        Some(AttestedResponse {
            status,
            body: value.to_string(),
        })
    }

    async fn post(
        &self,
        path: &str,
        body: Vec<u8>,
        correlation_id: &CorrelationId,
        attestation: Option<&AttestationBlob>,
    ) -> Result<(u16, Value), AttestKitError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let client_id = self.client_id.get().await?;

        log::debug!("invoking {path} ({correlation_id})");
        let mut builder = self
            .request
            .post(&url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(CLIENT_ID_HEADER, client_id)
            .header(REQUEST_ID_HEADER, correlation_id.as_str())
            .body(body);
        if let Some(attestation) = attestation {
            builder = builder.header(CLIENT_ATTESTATION_HEADER, attestation.as_str());
        }

        let response = self.request.handle(builder).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttestKitError::NetworkError {
                url,
                status: Some(status.as_u16()),
                error: "response was not successful".to_string(),
            });
        }
        let text = response.text().await?;
        let value = serde_json::from_str(&text)?;
        Ok((status.as_u16(), value))
    }
}
