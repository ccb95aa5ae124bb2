//! # Core Configuration Module
//!
//! Provides configuration management for the playlist core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding the host bridges and the settings for the credential flow and the
//! remote playlist API. Validation is fail-fast: a missing bridge or an out of
//! range setting is reported by `build()`, not at first use.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - remote API transport (desktop default: reqwest)
//!
//! ## Optional Dependencies
//!
//! - `SecureStore` - durable copy of the cached access token
//!   (desktop default with `secure-store`: OS keychain)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .http_client(Arc::new(MyHttpClient))
//!     .oauth_client_id("1234.apps.googleusercontent.com")
//!     .page_size(25)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, RetryPolicy, SecureStore};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable consulted when no client id is set explicitly.
pub const CLIENT_ID_ENV_VAR: &str = "GOOGLE_CLIENT_ID";

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/youtube";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/oauth/callback";

/// Largest page the playlist API returns.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Core configuration
#[derive(Clone)]
pub struct CoreConfig {
    /// HTTP transport for the remote API
    pub http_client: Arc<dyn HttpClient>,

    /// Durable credential cache; `None` keeps the token in memory only
    pub secure_store: Option<Arc<dyn SecureStore>>,

    /// Credential acquisition settings
    pub auth: AuthSettings,

    /// Remote playlist API settings
    pub api: ApiSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field(
                "secure_store",
                &self.secure_store.as_ref().map(|_| "SecureStore { ... }"),
            )
            .field("auth", &self.auth)
            .field("api", &self.api)
            .finish()
    }
}

/// Settings for the user-consent credential flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    /// OAuth client id. Absent means credential acquisition is denied.
    pub client_id: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// Upper bound on waiting for the user to complete consent
    pub credential_timeout: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: vec![DEFAULT_SCOPE.to_string()],
            credential_timeout: Duration::from_secs(20),
        }
    }
}

/// Settings for the remote playlist API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub page_size: u32,
    pub request_timeout: Duration,
    pub retry_policy: RetryPolicy,
    /// Resolve item durations with an extra batched read during load
    pub fetch_durations: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            request_timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
            fetch_durations: true,
        }
    }
}

impl ApiSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(Error::Config(format!(
                "API base URL must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.retry_policy.max_attempts == 0 {
            return Err(Error::Config(
                "Retry policy must allow at least one attempt".to_string(),
            ));
        }

        Ok(())
    }
}

impl AuthSettings {
    pub fn validate(&self) -> Result<()> {
        if self.scopes.is_empty() {
            return Err(Error::Config(
                "At least one OAuth scope is required".to_string(),
            ));
        }

        if self.redirect_uri.is_empty() {
            return Err(Error::Config("Redirect URI cannot be empty".to_string()));
        }

        if self.credential_timeout.is_zero() {
            return Err(Error::Config(
                "Credential timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.auth.validate()?;
        self.api.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the playlist API. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Other hosts: inject a platform HTTP client."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(timeout));
    Ok(client)
}

#[cfg(feature = "secure-store")]
fn provide_default_secure_store() -> Option<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    let store: Arc<dyn SecureStore> = Arc::new(KeyringSecureStore::new());
    Some(store)
}

#[cfg(not(feature = "secure-store"))]
fn provide_default_secure_store() -> Option<Arc<dyn SecureStore>> {
    None
}

fn client_id_from_env() -> Option<String> {
    std::env::var(CLIENT_ID_ENV_VAR)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builder for [`CoreConfig`]
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    auth: AuthSettings,
    api: ApiSettings,
    skip_env: bool,
}

impl CoreConfigBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn oauth_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.auth.client_id = Some(client_id.into());
        self
    }

    /// Do not fall back to the `GOOGLE_CLIENT_ID` environment variable.
    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.auth.redirect_uri = uri.into();
        self
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn credential_timeout(mut self, timeout: Duration) -> Self {
        self.auth.credential_timeout = timeout;
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.api.page_size = page_size;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.api.request_timeout = timeout;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.api.retry_policy = policy;
        self
    }

    pub fn fetch_durations(mut self, enabled: bool) -> Self {
        self.api.fetch_durations = enabled;
        self
    }

    pub fn build(self) -> Result<CoreConfig> {
        let mut auth = self.auth;
        if auth.client_id.is_none() && !self.skip_env {
            auth.client_id = client_id_from_env();
        }
        auth.client_id = auth.client_id.filter(|id| !id.trim().is_empty());

        let http_client = match self.http_client {
            Some(client) => client,
            #[cfg(feature = "desktop-shims")]
            None => provide_default_http_client(self.api.request_timeout)?,
            #[cfg(not(feature = "desktop-shims"))]
            None => provide_default_http_client()?,
        };

        let secure_store = self.secure_store.or_else(provide_default_secure_store);

        let config = CoreConfig {
            http_client,
            secure_store,
            auth,
            api: self.api,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, HttpRequest, HttpResponse};

    struct NoopHttpClient;

    #[async_trait]
    impl HttpClient for NoopHttpClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> std::result::Result<HttpResponse, BridgeError> {
            Err(BridgeError::NotAvailable("noop".to_string()))
        }
    }

    fn builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .http_client(Arc::new(NoopHttpClient))
            .without_env()
    }

    #[test]
    fn test_defaults() {
        let config = builder().build().unwrap();

        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api.page_size, 50);
        assert_eq!(config.api.request_timeout, Duration::from_secs(30));
        assert_eq!(config.api.retry_policy, RetryPolicy::default());
        assert!(config.api.fetch_durations);
        assert_eq!(config.auth.scopes, vec![DEFAULT_SCOPE.to_string()]);
        assert_eq!(config.auth.credential_timeout, Duration::from_secs(20));
        assert_eq!(config.auth.client_id, None);
    }

    #[test]
    fn test_custom_settings() {
        let config = builder()
            .oauth_client_id("client-123")
            .page_size(10)
            .fetch_durations(false)
            .credential_timeout(Duration::from_secs(5))
            .api_base_url("http://localhost:9000/youtube/v3")
            .build()
            .unwrap();

        assert_eq!(config.auth.client_id.as_deref(), Some("client-123"));
        assert_eq!(config.api.page_size, 10);
        assert!(!config.api.fetch_durations);
        assert_eq!(config.api.base_url, "http://localhost:9000/youtube/v3");
    }

    #[test]
    fn test_blank_client_id_is_treated_as_absent() {
        let config = builder().oauth_client_id("   ").build().unwrap();
        assert_eq!(config.auth.client_id, None);
    }

    #[test]
    fn test_page_size_out_of_range() {
        assert!(matches!(builder().page_size(0).build(), Err(Error::Config(_))));
        assert!(matches!(builder().page_size(51).build(), Err(Error::Config(_))));
        assert!(builder().page_size(1).build().is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let result = builder().api_base_url("ftp://example.com").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_scopes_rejected() {
        let result = builder().scopes(Vec::<String>::new()).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_attempt_retry_policy_rejected() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(matches!(
            builder().retry_policy(policy).build(),
            Err(Error::Config(_))
        ));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_http_client_reports_capability() {
        let result = CoreConfig::builder().without_env().build();
        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "HttpClient")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_default_http_client() {
        let config = CoreConfig::builder().without_env().build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = builder().oauth_client_id("abc").build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("HttpClient { ... }"));
        assert!(debug.contains("page_size: 50"));
    }
}
