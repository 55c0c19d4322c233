//! Resilient HTTP retrieval with payload validation.
//!
//! Every attempt is classified in one step: the body is decoded once and the
//! result is either a usable collection, an empty collection, or malformed.
//! Empty and malformed payloads are retried exactly like network failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use paddock_core::{ConfigError, FetchError, RetryConfig, ValidationError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::observer::{endpoint_label, AttemptOutcome, IngestObserver, NoopObserver};

// ============================================================================
// TRANSPORT
// ============================================================================

/// Raw response of a single GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One network round trip. Implementations do not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse, FetchError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("paddock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http_client".to_string(),
                value: format!("timeout={:?}", timeout),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, FetchError> {
        let transport_err = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport_err)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_err)?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Result of decoding one response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Non-empty JSON array or object.
    Valid(Value),
    /// Well-formed JSON array or object without elements.
    EmptyCollection(&'static str),
    /// Not usable at all.
    Malformed(ValidationError),
}

/// Decode and classify a response body.
pub fn classify(body: &[u8]) -> Classified {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Classified::Malformed(ValidationError::EmptyBody);
    }

    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            return Classified::Malformed(ValidationError::Malformed {
                reason: e.to_string(),
            })
        }
    };

    match &value {
        Value::Array(items) if items.is_empty() => Classified::EmptyCollection("array"),
        Value::Object(fields) if fields.is_empty() => Classified::EmptyCollection("object"),
        Value::Array(_) | Value::Object(_) => Classified::Valid(value),
        Value::Null => Classified::Malformed(ValidationError::NotACollection { kind: "null" }),
        Value::Bool(_) => Classified::Malformed(ValidationError::NotACollection { kind: "boolean" }),
        Value::Number(_) => Classified::Malformed(ValidationError::NotACollection { kind: "number" }),
        Value::String(_) => Classified::Malformed(ValidationError::NotACollection { kind: "string" }),
    }
}

// ============================================================================
// FETCHER
// ============================================================================

/// Validated payload: the raw body and its decoded JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub body: Vec<u8>,
    pub value: Value,
}

/// Retrying fetcher. Stateless between calls; cheap to clone.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
    observer: Arc<dyn IngestObserver>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher").field("retry", &self.retry).finish()
    }
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryConfig) -> Self {
        Self {
            transport,
            retry,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn IngestObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Fetch a URL and return the validated body bytes.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_payload(url).await.map(|payload| payload.body)
    }

    /// Fetch a URL and decode the validated payload into `T`.
    ///
    /// A payload that passes validation but does not match `T` is not
    /// retried; it fails with [`FetchError::Decode`].
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let payload = self.fetch_payload(url).await?;
        serde_json::from_value(payload.value).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Fetch with retries. Sleeps the configured backoff between attempts,
    /// never after the last one.
    pub async fn fetch_payload(&self, url: &str) -> Result<Payload, FetchError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let endpoint = endpoint_label(url);
        let mut attempt = 1;

        loop {
            match self.attempt(url).await {
                Ok(payload) => {
                    self.observer
                        .fetch_attempt(endpoint, AttemptOutcome::Success);
                    debug!(url, attempt, bytes = payload.body.len(), "fetch succeeded");
                    return Ok(payload);
                }
                Err(cause) => {
                    self.observer.fetch_attempt(endpoint, outcome_of(&cause));
                    warn!(url, attempt, max_attempts, error = %cause, "fetch attempt failed");

                    if attempt >= max_attempts {
                        return Err(FetchError::Exhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last: Box::new(cause),
                        });
                    }

                    tokio::time::sleep(self.retry.backoff_after(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<Payload, FetchError> {
        let response = self.transport.get(url).await?;
        if !response.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        let invalid = |source| FetchError::Invalid {
            url: url.to_string(),
            source,
        };
        match classify(&response.body) {
            Classified::Valid(value) => Ok(Payload {
                body: response.body,
                value,
            }),
            Classified::EmptyCollection(kind) => {
                Err(invalid(ValidationError::EmptyCollection { kind }))
            }
            Classified::Malformed(source) => Err(invalid(source)),
        }
    }
}

fn outcome_of(error: &FetchError) -> AttemptOutcome {
    match error {
        FetchError::Status { .. } => AttemptOutcome::Status,
        FetchError::Invalid { .. } | FetchError::Decode { .. } => AttemptOutcome::Invalid,
        FetchError::Transport { .. } | FetchError::Exhausted { .. } => AttemptOutcome::Transport,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_valid_collections() {
        assert!(matches!(classify(br#"[{"a":1}]"#), Classified::Valid(_)));
        assert!(matches!(classify(br#"{"detail":"x"}"#), Classified::Valid(_)));
    }

    #[test]
    fn test_classify_empty_collections() {
        assert_eq!(classify(b"[]"), Classified::EmptyCollection("array"));
        assert_eq!(classify(b" {} "), Classified::EmptyCollection("object"));
    }

    #[test]
    fn test_classify_malformed() {
        assert_eq!(classify(b""), Classified::Malformed(ValidationError::EmptyBody));
        assert_eq!(classify(b"  \n"), Classified::Malformed(ValidationError::EmptyBody));
        assert!(matches!(
            classify(b"[{\"a\":"),
            Classified::Malformed(ValidationError::Malformed { .. })
        ));
        assert_eq!(
            classify(b"42"),
            Classified::Malformed(ValidationError::NotACollection { kind: "number" })
        );
        assert_eq!(
            classify(b"null"),
            Classified::Malformed(ValidationError::NotACollection { kind: "null" })
        );
    }

    #[test]
    fn test_outcome_labels() {
        let status = FetchError::Status {
            url: "u".to_string(),
            status: 500,
        };
        assert_eq!(outcome_of(&status), AttemptOutcome::Status);
        assert_eq!(outcome_of(&status).as_str(), "http_error");
    }

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(Duration::from_secs(5)).is_ok());
    }
}
