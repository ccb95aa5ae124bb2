//! HTTP transport seam and the retry schedule applied on top of it

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing request, built by chaining
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    /// Per-request override of the client timeout
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        let value = format!("Bearer {}", token.into());
        self.header("Authorization", value)
    }

    pub fn accept_json(self) -> Self {
        self.header("Accept", "application/json")
    }

    /// Makes the write conditional on the resource still carrying `etag`
    pub fn if_match(self, etag: impl Into<String>) -> Self {
        self.header("If-Match", etag)
    }

    /// Serializes `payload` as the body and sets the content type
    pub fn json<T: Serialize>(self, payload: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(payload)
            .map_err(|e| BridgeError::OperationFailed(format!("cannot encode body: {}", e)))?;
        Ok(self
            .header("Content-Type", "application/json")
            .body(Bytes::from(encoded)))
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::OperationFailed(format!("cannot decode body: {}", e)))
    }

    pub fn text(&self) -> Result<String> {
        std::str::from_utf8(&self.body)
            .map(str::to_owned)
            .map_err(|e| BridgeError::OperationFailed(format!("body is not UTF-8: {}", e)))
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// `Retry-After` given in whole seconds; HTTP-date values are ignored
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("Retry-After")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }
}

/// Backoff schedule for retryable failures.
///
/// `max_attempts` counts the first request, so 3 means at most two retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Double the delay after each failure instead of keeping it flat
    pub use_exponential_backoff: bool,
}

impl RetryPolicy {
    /// Wait before the retry that follows failed attempt `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if self.use_exponential_backoff {
            let factor = 1u32 << attempt.saturating_sub(1).min(16);
            self.base_delay.checked_mul(factor).unwrap_or(self.max_delay)
        } else {
            self.base_delay
        };
        delay.min(self.max_delay)
    }

    /// Like [`delay_for_attempt`](Self::delay_for_attempt) but honours a
    /// server-provided hint, still capped at `max_delay`
    pub fn delay_with_hint(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint.min(self.max_delay),
            None => self.delay_for_attempt(attempt),
        }
    }

    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            use_exponential_backoff: true,
        }
    }
}

/// One round trip per call.
///
/// Non-2xx statuses come back as responses; only transport failures are
/// errors. Retry and credential refresh belong to the caller.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
