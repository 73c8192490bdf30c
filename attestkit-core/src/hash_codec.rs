//! Deterministic serialization and hashing of attested payloads.
//!
//! The verifier recomputes every digest from its own copy of the payload, so
//! both sides must agree on the exact bytes. The canonical form is compact
//! JSON with object keys sorted by their UTF-8 bytes at every nesting level.
//! Array order is preserved and scalars are rendered by `serde_json`.
//!
//! Verifiers re-canonicalizing a body must follow the same two rules:
//!
//! - Keys compare by UTF-8 bytes, which matches Unicode code point order.
//!   It differs from UTF-16 code unit order (JavaScript's default string
//!   sort) only for keys mixing characters above U+FFFF with ones in
//!   U+E000..=U+FFFF.
//! - Numbers keep the form they were parsed with: `1` and `1.0` are
//!   different bytes. Callers wanting a single form send integers as
//!   integers. Since the body is sent exactly as signed, a verifier hashing
//!   the received bytes as-is needs neither rule.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;
use sha2::{Digest as _, Sha256};

use crate::{error::AttestKitError, types::Nonce};

/// Length in bytes of a [`Digest`].
pub const DIGEST_LEN: usize = 32;

/// SHA-256 digest of a challenge or request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Encodes the digest with the standard, padded base64 alphabet, as
    /// expected by the attestation provider.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

/// Serializes `value` into its canonical byte form.
///
/// # Errors
///
/// Returns an error if a scalar cannot be serialized.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, AttestKitError> {
    let mut out = Vec::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), AttestKitError> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));
            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(item, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}

/// Hashes `bytes` with SHA-256.
#[must_use]
pub fn digest(bytes: &[u8]) -> Digest {
    Digest(Sha256::digest(bytes).into())
}

/// Digest a new key is attested over: SHA-256 of the raw nonce bytes.
#[must_use]
pub fn challenge_digest(nonce: &Nonce) -> Digest {
    digest(nonce.as_str().as_bytes())
}

/// Digest a request is signed over: SHA-256 of its canonical form.
///
/// # Errors
///
/// Returns an error if the body cannot be canonicalized.
pub fn request_digest(body: &Value) -> Result<Digest, AttestKitError> {
    canonicalize(body).map(|bytes| digest(&bytes))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_canonical_form_sorts_keys_and_strips_whitespace() {
        let value: Value = serde_json::from_str(
            r#"{ "x": 1,
                 "attestationNonce": "n2",
                 "nested": { "b": [3, {"z": null, "a": true}], "a": "é" } }"#,
        )
        .unwrap();
        let bytes = canonicalize(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"attestationNonce":"n2","nested":{"a":"é","b":[3,{"a":true,"z":null}]},"x":1}"#
        );
    }

    #[test]
    fn test_digest_is_independent_of_field_order() {
        let mut forward = serde_json::Map::new();
        forward.insert("x".to_string(), json!(1));
        forward.insert("attestationNonce".to_string(), json!("n2"));
        forward.insert("items".to_string(), json!([{"b": 2, "a": 1}]));

        let mut backward = serde_json::Map::new();
        backward.insert("items".to_string(), json!([{"a": 1, "b": 2}]));
        backward.insert("attestationNonce".to_string(), json!("n2"));
        backward.insert("x".to_string(), json!(1));

        assert_eq!(
            request_digest(&Value::Object(forward)).unwrap(),
            request_digest(&Value::Object(backward)).unwrap()
        );
    }

    #[test]
    fn test_numbers_keep_their_parsed_form() {
        let value: Value = serde_json::from_str(r#"{"b": 1.0, "a": 1}"#).unwrap();
        assert_eq!(canonicalize(&value).unwrap(), br#"{"a":1,"b":1.0}"#.to_vec());
    }

    #[test]
    fn test_keys_sort_by_code_point() {
        // U+FF61 sorts before U+1F600 by code point, after it by UTF-16 units.
        let value = json!({"\u{1F600}": 2, "\u{FF61}": 1});
        assert_eq!(
            String::from_utf8(canonicalize(&value).unwrap()).unwrap(),
            "{\"\u{FF61}\":1,\"\u{1F600}\":2}"
        );
    }

    #[test]
    fn test_array_order_is_significant() {
        assert_ne!(
            request_digest(&json!({"a": [1, 2]})).unwrap(),
            request_digest(&json!({"a": [2, 1]})).unwrap()
        );
    }

    #[test]
    fn test_challenge_digest_hashes_raw_nonce_bytes() {
        let nonce = Nonce::new("abc".to_string());
        // SHA-256("abc")
        assert_eq!(
            challenge_digest(&nonce).as_bytes().as_slice(),
            [
                0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde,
                0x5d, 0xae, 0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c,
                0xb4, 0x10, 0xff, 0x61, 0xf2, 0x00, 0x15, 0xad,
            ]
            .as_slice()
        );
        assert_eq!(
            challenge_digest(&nonce).to_base64(),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
    }
}
