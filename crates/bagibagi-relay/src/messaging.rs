//! Outbound publish to Roblox Open Cloud MessagingService.
//!
//! One attempt per donation, bounded by the configured timeout. There is no
//! retry, backoff or queueing; every failure is terminal for the request.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::config::Credentials;
use crate::donation::DonationNotice;

/// Largest downstream error body echoed back to the caller.
const MAX_DETAILS_BYTES: usize = 4096;

/// Publish request body: the notice travels as a JSON string.
#[derive(Debug, Clone, Serialize)]
pub struct PublishBody {
    pub message: String,
}

impl PublishBody {
    pub fn new(notice: &DonationNotice) -> Result<Self, RelayFailure> {
        let message = serde_json::to_string(notice)
            .map_err(|e| RelayFailure::Encode(e.to_string()))?;
        Ok(Self { message })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayFailure {
    #[error("failed to encode donation: {0}")]
    Encode(String),

    #[error("Roblox API request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u128 },

    #[error("Roblox API request failed: {0}")]
    Network(String),

    #[error("Roblox API returned status {status}")]
    Status { status: u16, body: Option<Value> },
}

impl RelayFailure {
    /// Downstream HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            RelayFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Downstream response body, when one was received.
    pub fn details(&self) -> Option<&Value> {
        match self {
            RelayFailure::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// Successful publish.
#[derive(Debug, Clone, Copy)]
pub struct Published {
    pub status: u16,
    pub duration: Duration,
}

/// Client for the MessagingService publish endpoint.
#[derive(Debug, Clone)]
pub struct MessagingClient {
    client: reqwest::Client,
    base_url: String,
    topic: String,
    timeout: Duration,
}

impl MessagingClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        topic: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            topic: topic.into(),
            timeout,
        }
    }

    /// Publish URL for a universe. The universe id is percent-encoded into
    /// its path segment.
    pub fn publish_url(&self, universe_id: &str) -> String {
        format!(
            "{}/messaging-service/v1/universes/{}/topics/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(universe_id),
            urlencoding::encode(&self.topic),
        )
    }

    /// Send one donation. Non-2xx responses are failures.
    pub async fn publish(
        &self,
        credentials: Credentials<'_>,
        notice: &DonationNotice,
    ) -> Result<Published, RelayFailure> {
        let url = self.publish_url(credentials.universe_id);
        let body = PublishBody::new(notice)?;

        tracing::info!(
            url = %url,
            payload = %body.message,
            "sending donation to Roblox"
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-api-key", credentials.api_key)
            .header("content-type", "application/json")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status.is_success() {
            let duration = start.elapsed();
            tracing::info!(
                status = status.as_u16(),
                elapsed_ms = duration.as_millis() as u64,
                "donation delivered to Roblox"
            );
            return Ok(Published {
                status: status.as_u16(),
                duration,
            });
        }

        let body = match response.bytes().await {
            Ok(bytes) if !bytes.is_empty() => Some(decode_details(&bytes)),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read Roblox error body");
                None
            }
        };
        tracing::error!(
            status = status.as_u16(),
            body = ?body,
            "Roblox API rejected donation"
        );
        Err(RelayFailure::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn classify(&self, e: reqwest::Error) -> RelayFailure {
        if e.is_timeout() {
            tracing::error!(timeout_ms = self.timeout.as_millis() as u64, "Roblox API request timed out");
            RelayFailure::Timeout {
                timeout_ms: self.timeout.as_millis(),
            }
        } else {
            tracing::error!(error = %e, "Roblox API request failed");
            RelayFailure::Network(e.to_string())
        }
    }
}

/// JSON bodies are passed through; anything else becomes a (truncated)
/// string.
fn decode_details(bytes: &[u8]) -> Value {
    if let Ok(json) = serde_json::from_slice::<Value>(bytes) {
        return json;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut end = text.len().min(MAX_DETAILS_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    Value::String(text[..end].to_string())
}
