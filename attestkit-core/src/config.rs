use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::AttestKitError;

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_RETRIES: u32 = 3; // total attempts = 4

/// Connection settings for the remote verifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
pub struct AttestationConfig {
    /// Base URL of the verifier. Endpoint names are appended to it.
    pub base_url: String,
    /// Timeout of a single HTTP attempt, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Retries for transient HTTP failures (timeouts, 429, 5xx).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Upper bound for each suspending step of a lifecycle operation. A step
    /// that exceeds it fails the operation without committing anything.
    #[serde(default)]
    pub step_timeout_ms: Option<u64>,
    /// Permits a plain `http` base URL. Only meant for local development.
    #[serde(default)]
    pub allow_insecure_http: bool,
}

const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl AttestationConfig {
    /// Builds a configuration with defaults for everything but the base URL.
    #[must_use]
    pub const fn new(base_url: String) -> Self {
        Self {
            base_url,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            step_timeout_ms: None,
            allow_insecure_http: false,
        }
    }

    /// Parses a configuration from JSON and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the configuration is invalid.
    pub fn from_json(json: &str) -> Result<Self, AttestKitError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AttestKitError::InvalidInput {
                attribute: "config".to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the base URL is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be parsed, is not HTTP(S), or
    /// is plain HTTP without `allow_insecure_http`.
    pub fn validate(&self) -> Result<(), AttestKitError> {
        let invalid = |reason: &str| AttestKitError::InvalidInput {
            attribute: "base_url".to_string(),
            reason: reason.to_string(),
        };
        let url = Url::parse(&self.base_url).map_err(|e| invalid(&e.to_string()))?;
        match url.scheme() {
            "https" => Ok(()),
            "http" if self.allow_insecure_http => Ok(()),
            "http" => Err(invalid("plain http requires allow_insecure_http")),
            other => Err(invalid(&format!("unsupported scheme {other}"))),
        }
    }

    pub(crate) const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub(crate) const fn step_timeout(&self) -> Option<Duration> {
        match self.step_timeout_ms {
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_from_json_applies_defaults() {
        let config =
            AttestationConfig::from_json(r#"{"base_url": "https://verifier.example"}"#)
                .unwrap();
        assert_eq!(config, AttestationConfig::new("https://verifier.example".into()));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.step_timeout(), None);
    }

    #[test]
    fn test_from_json_reads_all_fields() {
        let config = AttestationConfig::from_json(
            r#"{
                "base_url": "http://127.0.0.1:3000",
                "request_timeout_ms": 250,
                "max_retries": 0,
                "step_timeout_ms": 1500,
                "allow_insecure_http": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.step_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test_case("http://verifier.example", false ; "plain http")]
    #[test_case("ftp://verifier.example", true ; "unsupported scheme")]
    #[test_case("verifier.example", true ; "relative url")]
    fn test_validate_rejects(base_url: &str, allow_insecure_http: bool) {
        let config = AttestationConfig {
            allow_insecure_http,
            ..AttestationConfig::new(base_url.to_string())
        };
        assert!(matches!(
            config.validate(),
            Err(AttestKitError::InvalidInput { attribute, .. }) if attribute == "base_url"
        ));
    }

    #[test]
    fn test_from_json_rejects_malformed_json() {
        assert!(matches!(
            AttestationConfig::from_json("{"),
            Err(AttestKitError::InvalidInput { attribute, .. }) if attribute == "config"
        ));
    }
}
