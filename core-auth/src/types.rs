use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds before the real expiry at which a token is treated as expired.
pub const EXPIRY_BUFFER_SECONDS: i64 = 60;

/// Bearer access token obtained through user consent
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    value: String,
    scopes: Vec<String>,
    /// `None` when the provider did not report a lifetime
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(
        value: impl Into<String>,
        scopes: Vec<String>,
        expires_in: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            value: value.into(),
            scopes,
            expires_at: expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }

    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_expired_with_buffer(now, EXPIRY_BUFFER_SECONDS)
    }

    pub fn is_expired_with_buffer(&self, now: DateTime<Utc>, buffer_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at - Duration::seconds(buffer_seconds),
            None => false,
        }
    }

    /// Whether every requested scope was granted
    pub fn covers(&self, requested: &[String]) -> bool {
        requested.iter().all(|scope| self.scopes.contains(scope))
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
