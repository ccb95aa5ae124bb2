//! Credential provider
//!
//! [`CredentialProvider`] is the contract the playlist facade depends on.
//! [`ConsentCredentialProvider`] implements it with the user-consent flow:
//! serve a cached token when one is valid, otherwise ask the host to run the
//! consent UI and wait for the callback for at most the configured timeout.

use crate::consent::{
    build_consent_url, consent_channel, ConsentOutcome, ConsentRequest, ConsentRequester,
};
use crate::error::{AuthError, Result};
use crate::token_store::CredentialStore;
use crate::types::AccessToken;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::time::{Clock, SystemClock};
use bytes::Bytes;
use core_runtime::config::AuthSettings;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Google OAuth 2.0 token revocation endpoint
pub const REVOCATION_ENDPOINT: &str = "https://oauth2.googleapis.com/revoke";

/// Source of bearer tokens for remote calls
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return a valid access token for `scopes`, acquiring one if needed.
    ///
    /// Any failure here means the caller cannot act on the user's behalf.
    async fn get_access_token(&self, scopes: &[String]) -> Result<String>;

    /// Invalidate the cached token so the next call re-acquires.
    async fn clear_access_token(&self);

    /// Whether a valid token is cached right now
    async fn has_cached_token(&self) -> bool;

    /// Revoke the cached token at the provider and forget it locally.
    async fn revoke(&self) -> Result<()>;
}

/// Consent-based implementation of [`CredentialProvider`]
pub struct ConsentCredentialProvider {
    settings: AuthSettings,
    store: Arc<CredentialStore>,
    requester: Arc<dyn ConsentRequester>,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
    revocation_endpoint: String,
    /// Serializes acquisition so concurrent callers share one consent prompt
    acquire_lock: Mutex<()>,
}

impl ConsentCredentialProvider {
    pub fn new(
        settings: AuthSettings,
        store: Arc<CredentialStore>,
        requester: Arc<dyn ConsentRequester>,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            settings,
            store,
            requester,
            http_client,
            clock: Arc::new(SystemClock),
            event_bus: None,
            revocation_endpoint: REVOCATION_ENDPOINT.to_string(),
            acquire_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_revocation_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.revocation_endpoint = endpoint.into();
        self
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = self.event_bus.as_ref() {
            let _ = bus.emit(CoreEvent::Auth(event));
        }
    }

    fn fail(&self, error: AuthError) -> AuthError {
        warn!(error = %error, "Credential acquisition failed");
        self.emit(AuthEvent::AuthError {
            message: error.to_string(),
            recoverable: error.is_recoverable(),
        });
        error
    }

    async fn cached_for(&self, scopes: &[String]) -> Option<AccessToken> {
        self.store
            .current(self.clock.now())
            .await
            .filter(|token| token.covers(scopes))
    }

    async fn acquire(&self, client_id: &str, scopes: &[String]) -> Result<AccessToken> {
        let state = Uuid::new_v4().simple().to_string();
        let url = build_consent_url(client_id, &self.settings.redirect_uri, scopes, &state)?;
        let (callback, receiver) = consent_channel();

        self.emit(AuthEvent::ConsentRequested {
            scopes: scopes.to_vec(),
        });
        info!(scope_count = scopes.len(), "Requesting user consent");

        self.requester
            .request_consent(
                ConsentRequest {
                    url,
                    state: state.clone(),
                    scopes: scopes.to_vec(),
                },
                callback,
            )
            .await?;

        let wait = self.settings.credential_timeout;
        let outcome = match timeout(wait, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => return Err(AuthError::ConsentAbandoned),
            Err(_) => {
                return Err(AuthError::ConsentTimeout {
                    seconds: wait.as_secs(),
                })
            }
        };

        match outcome {
            ConsentOutcome::Denied(reason) => Err(AuthError::ConsentDenied(reason)),
            ConsentOutcome::Granted {
                access_token,
                state: returned_state,
                expires_in,
                scopes: granted,
            } => {
                if returned_state != state {
                    warn!("Consent callback carried an unexpected state value");
                    return Err(AuthError::InvalidState);
                }
                Ok(AccessToken::new(
                    access_token,
                    granted.unwrap_or_else(|| scopes.to_vec()),
                    expires_in,
                    self.clock.now(),
                ))
            }
        }
    }
}

#[async_trait]
impl CredentialProvider for ConsentCredentialProvider {
    #[instrument(skip(self), fields(scopes = ?scopes))]
    async fn get_access_token(&self, scopes: &[String]) -> Result<String> {
        let client_id = match self.settings.client_id.as_deref() {
            Some(id) => id.to_string(),
            None => return Err(self.fail(AuthError::MissingClientId)),
        };

        if let Some(token) = self.cached_for(scopes).await {
            return Ok(token.secret().to_string());
        }

        let _guard = self.acquire_lock.lock().await;

        // Another caller may have finished consent while we waited
        if let Some(token) = self.cached_for(scopes).await {
            debug!("Using token acquired by a concurrent caller");
            return Ok(token.secret().to_string());
        }

        let token = self
            .acquire(&client_id, scopes)
            .await
            .map_err(|e| self.fail(e))?;

        let secret = token.secret().to_string();
        let expires_at = token.expires_at().map(|t| t.timestamp());

        if let Err(e) = self.store.store(token).await {
            warn!(error = %e, "Access token cached in memory only");
        }

        self.emit(AuthEvent::TokenAcquired { expires_at });
        info!(expires_at = ?expires_at, "Access token acquired");

        Ok(secret)
    }

    async fn clear_access_token(&self) {
        self.store.clear().await;
        self.emit(AuthEvent::TokenCleared);
    }

    async fn has_cached_token(&self) -> bool {
        self.store.current(self.clock.now()).await.is_some()
    }

    #[instrument(skip(self))]
    async fn revoke(&self) -> Result<()> {
        let Some(token) = self.store.current(self.clock.now()).await else {
            debug!("No cached token to revoke");
            return Ok(());
        };

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("token", token.secret())
            .finish();

        let request = HttpRequest::new(HttpMethod::Post, &self.revocation_endpoint)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(body));

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| self.fail(AuthError::RevokeFailed(e.to_string())))?;

        // 400 means the token is already invalid at the provider
        if !response.is_success() && response.status != 400 {
            return Err(self.fail(AuthError::RevokeFailed(format!(
                "revocation endpoint returned status {}",
                response.status
            ))));
        }

        self.store.clear().await;
        self.emit(AuthEvent::TokenRevoked);
        info!("Access token revoked");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::ConsentCallback;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use bridge_traits::time::FixedClock;
    use chrono::{TimeZone, Utc};
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    /// Scripted host UI
    enum Behaviour {
        Grant { echo_state: bool },
        Deny,
        Drop,
        Ignore,
    }

    struct ScriptedConsent {
        behaviour: Behaviour,
        requests: AtomicUsize,
        parked: std::sync::Mutex<Vec<ConsentCallback>>,
    }

    impl ScriptedConsent {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                requests: AtomicUsize::new(0),
                parked: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ConsentRequester for ScriptedConsent {
        async fn request_consent(
            &self,
            request: ConsentRequest,
            callback: ConsentCallback,
        ) -> Result<()> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Grant { echo_state } => {
                    let state = if echo_state {
                        request.state
                    } else {
                        "forged".to_string()
                    };
                    callback.complete("ya29.granted", state, Some(3600));
                }
                Behaviour::Deny => {
                    callback.deny("access_denied");
                }
                Behaviour::Drop => drop(callback),
                Behaviour::Ignore => self.parked.lock().unwrap().push(callback),
            }
            Ok(())
        }
    }

    fn settings(client_id: Option<&str>) -> AuthSettings {
        AuthSettings {
            client_id: client_id.map(String::from),
            credential_timeout: Duration::from_millis(50),
            ..AuthSettings::default()
        }
    }

    fn scopes() -> Vec<String> {
        AuthSettings::default().scopes
    }

    fn provider(
        client_id: Option<&str>,
        consent: Arc<ScriptedConsent>,
        http: MockHttpClient,
    ) -> ConsentCredentialProvider {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        ConsentCredentialProvider::new(
            settings(client_id),
            Arc::new(CredentialStore::in_memory()),
            consent,
            Arc::new(http),
        )
        .with_clock(Arc::new(FixedClock(now)))
    }

    #[tokio::test]
    async fn test_missing_client_id_is_denied_without_prompt() {
        let consent = ScriptedConsent::new(Behaviour::Grant { echo_state: true });
        let provider = provider(None, consent.clone(), MockHttpClient::new());

        let result = provider.get_access_token(&scopes()).await;
        assert!(matches!(result, Err(AuthError::MissingClientId)));
        assert_eq!(consent.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_consent_then_cached() {
        let consent = ScriptedConsent::new(Behaviour::Grant { echo_state: true });
        let provider = provider(Some("client"), consent.clone(), MockHttpClient::new());

        assert_eq!(provider.get_access_token(&scopes()).await.unwrap(), "ya29.granted");
        assert_eq!(provider.get_access_token(&scopes()).await.unwrap(), "ya29.granted");
        assert_eq!(consent.requests.load(Ordering::SeqCst), 1);
        assert!(provider.has_cached_token().await);
    }

    #[tokio::test]
    async fn test_clear_forces_new_consent() {
        let consent = ScriptedConsent::new(Behaviour::Grant { echo_state: true });
        let provider = provider(Some("client"), consent.clone(), MockHttpClient::new());

        provider.get_access_token(&scopes()).await.unwrap();
        provider.clear_access_token().await;
        assert!(!provider.has_cached_token().await);

        provider.get_access_token(&scopes()).await.unwrap();
        assert_eq!(consent.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_state_mismatch_rejected() {
        let consent = ScriptedConsent::new(Behaviour::Grant { echo_state: false });
        let provider = provider(Some("client"), consent, MockHttpClient::new());

        let result = provider.get_access_token(&scopes()).await;
        assert!(matches!(result, Err(AuthError::InvalidState)));
        assert!(!provider.has_cached_token().await);
    }

    #[tokio::test]
    async fn test_denied_consent() {
        let consent = ScriptedConsent::new(Behaviour::Deny);
        let provider = provider(Some("client"), consent, MockHttpClient::new());

        let result = provider.get_access_token(&scopes()).await;
        assert!(matches!(result, Err(AuthError::ConsentDenied(reason)) if reason == "access_denied"));
    }

    #[tokio::test]
    async fn test_abandoned_consent() {
        let consent = ScriptedConsent::new(Behaviour::Drop);
        let provider = provider(Some("client"), consent, MockHttpClient::new());

        let result = provider.get_access_token(&scopes()).await;
        assert!(matches!(result, Err(AuthError::ConsentAbandoned)));
    }

    #[tokio::test]
    async fn test_consent_times_out() {
        let consent = ScriptedConsent::new(Behaviour::Ignore);
        let provider = provider(Some("client"), consent, MockHttpClient::new());

        let result = provider.get_access_token(&scopes()).await;
        assert!(matches!(result, Err(AuthError::ConsentTimeout { .. })));
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let consent = ScriptedConsent::new(Behaviour::Grant { echo_state: true });
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let provider =
            provider(Some("client"), consent, MockHttpClient::new()).with_event_bus(bus);

        provider.get_access_token(&scopes()).await.unwrap();
        provider.clear_access_token().await;

        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::ConsentRequested { .. })
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenAcquired { expires_at: Some(_) })
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenCleared)
        );
    }

    #[tokio::test]
    async fn test_revoke_posts_token_and_clears() {
        let consent = ScriptedConsent::new(Behaviour::Grant { echo_state: true });
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Post
                    && req.url == REVOCATION_ENDPOINT
                    && req.body.as_deref() == Some(b"token=ya29.granted".as_slice())
            })
            .times(1)
            .returning(|_| {
                Ok(HttpResponse {
                    status: 200,
                    headers: HashMap::new(),
                    body: Bytes::new(),
                })
            });
        let provider = provider(Some("client"), consent, http);

        provider.get_access_token(&scopes()).await.unwrap();
        provider.revoke().await.unwrap();
        assert!(!provider.has_cached_token().await);
    }

    #[tokio::test]
    async fn test_revoke_without_token_is_noop() {
        let consent = ScriptedConsent::new(Behaviour::Grant { echo_state: true });
        let mut http = MockHttpClient::new();
        http.expect_execute().times(0);
        let provider = provider(Some("client"), consent, http);

        provider.revoke().await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_server_error_keeps_token() {
        let consent = ScriptedConsent::new(Behaviour::Grant { echo_state: true });
        let mut http = MockHttpClient::new();
        http.expect_execute().returning(|_| {
            Ok(HttpResponse {
                status: 503,
                headers: HashMap::new(),
                body: Bytes::new(),
            })
        });
        let provider = provider(Some("client"), consent, http);

        provider.get_access_token(&scopes()).await.unwrap();
        assert!(matches!(
            provider.revoke().await,
            Err(AuthError::RevokeFailed(_))
        ));
        assert!(provider.has_cached_token().await);
    }
}
