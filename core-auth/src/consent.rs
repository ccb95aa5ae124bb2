//! User-consent flow
//!
//! The host owns the UI: it receives a [`ConsentRequest`] and a
//! [`ConsentCallback`] through [`ConsentRequester`], opens the authorization
//! URL, and resolves the callback when the provider redirects back. The core
//! awaits the paired receiver with a timeout, so nothing polls.
//!
//! ```ignore
//! struct BrowserConsent;
//!
//! #[async_trait]
//! impl ConsentRequester for BrowserConsent {
//!     async fn request_consent(&self, request: ConsentRequest, callback: ConsentCallback) -> Result<()> {
//!         open::that(&request.url)?;
//!         spawn_redirect_listener(move |redirect_url| {
//!             let _ = callback.complete_from_redirect(&redirect_url);
//!         });
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::{AuthError, Result};
use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

/// Google OAuth 2.0 authorization endpoint
pub const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// What the host must show to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRequest {
    /// Authorization URL to open
    pub url: String,
    /// Anti-forgery value the redirect must echo back
    pub state: String,
    pub scopes: Vec<String>,
}

/// Result delivered through the consent channel
#[derive(Clone, PartialEq, Eq)]
pub enum ConsentOutcome {
    Granted {
        access_token: String,
        state: String,
        expires_in: Option<i64>,
        /// Scopes reported by the provider, if any
        scopes: Option<Vec<String>>,
    },
    Denied(String),
}

impl std::fmt::Debug for ConsentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsentOutcome::Granted {
                expires_in, scopes, ..
            } => f
                .debug_struct("Granted")
                .field("access_token", &"[REDACTED]")
                .field("expires_in", expires_in)
                .field("scopes", scopes)
                .finish_non_exhaustive(),
            ConsentOutcome::Denied(reason) => f.debug_tuple("Denied").field(reason).finish(),
        }
    }
}

/// One-shot handle the host uses to finish the consent flow.
///
/// Dropping it without calling any method abandons the flow.
#[derive(Debug)]
pub struct ConsentCallback {
    sender: oneshot::Sender<ConsentOutcome>,
}

impl ConsentCallback {
    /// Deliver a granted token. Returns `false` if nobody is waiting anymore.
    pub fn complete(
        self,
        access_token: impl Into<String>,
        state: impl Into<String>,
        expires_in: Option<i64>,
    ) -> bool {
        self.send(ConsentOutcome::Granted {
            access_token: access_token.into(),
            state: state.into(),
            expires_in,
            scopes: None,
        })
    }

    /// Report that the user refused or the provider returned an error.
    pub fn deny(self, reason: impl Into<String>) -> bool {
        self.send(ConsentOutcome::Denied(reason.into()))
    }

    /// Parse an implicit-grant redirect (`...#access_token=..&state=..`) and
    /// resolve the flow with it.
    ///
    /// A redirect carrying neither a token nor an error resolves the flow as
    /// denied and returns `InvalidResponse`.
    pub fn complete_from_redirect(self, redirect_url: &str) -> Result<()> {
        match parse_redirect(redirect_url) {
            Ok(outcome) => {
                self.send(outcome);
                Ok(())
            }
            Err(e) => {
                self.send(ConsentOutcome::Denied(e.to_string()));
                Err(e)
            }
        }
    }

    fn send(self, outcome: ConsentOutcome) -> bool {
        let delivered = self.sender.send(outcome).is_ok();
        if !delivered {
            debug!("Consent outcome arrived after the flow was abandoned");
        }
        delivered
    }
}

/// Create the callback handed to the host and the receiver the core awaits.
pub fn consent_channel() -> (ConsentCallback, oneshot::Receiver<ConsentOutcome>) {
    let (sender, receiver) = oneshot::channel();
    (ConsentCallback { sender }, receiver)
}

/// Host hook that presents the consent screen
#[async_trait]
pub trait ConsentRequester: Send + Sync {
    /// Present `request.url` to the user and arrange for `callback` to be
    /// resolved from the provider's redirect.
    ///
    /// Returning `Ok` only means the UI was launched; completion is signalled
    /// through the callback.
    async fn request_consent(&self, request: ConsentRequest, callback: ConsentCallback)
        -> Result<()>;
}

/// Build the implicit-grant authorization URL
pub fn build_consent_url(
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
) -> Result<String> {
    let mut url = Url::parse(AUTHORIZATION_ENDPOINT)
        .map_err(|e| AuthError::Config(format!("Invalid authorization endpoint: {}", e)))?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("client_id", client_id);
        query.append_pair("redirect_uri", redirect_uri);
        query.append_pair("response_type", "token");
        query.append_pair("scope", &scopes.join(" "));
        query.append_pair("include_granted_scopes", "true");
        query.append_pair("prompt", "consent");
        query.append_pair("state", state);
    }

    Ok(url.to_string())
}

fn parse_redirect(redirect_url: &str) -> Result<ConsentOutcome> {
    let url = Url::parse(redirect_url)
        .map_err(|e| AuthError::InvalidResponse(format!("redirect is not a URL: {}", e)))?;

    // Implicit grant answers in the fragment; errors may come in the query
    let params: Vec<(String, String)> = url
        .fragment()
        .map(|f| url::form_urlencoded::parse(f.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let params = if params.is_empty() {
        url.query_pairs().into_owned().collect()
    } else {
        params
    };

    let get = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };

    if let Some(error) = get("error") {
        warn!(error = %error, "Consent redirect reported an error");
        return Ok(ConsentOutcome::Denied(error));
    }

    let access_token = get("access_token")
        .ok_or_else(|| AuthError::InvalidResponse("redirect has no access_token".to_string()))?;
    let state = get("state").unwrap_or_default();
    let expires_in = match get("expires_in") {
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            AuthError::InvalidResponse(format!("invalid expires_in '{}'", raw))
        })?),
        None => None,
    };
    let scopes = get("scope").map(|s| s.split_whitespace().map(String::from).collect());

    Ok(ConsentOutcome::Granted {
        access_token,
        state,
        expires_in,
        scopes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_consent_url() {
        let url = build_consent_url(
            "client-1",
            "http://127.0.0.1:8080/cb",
            &["https://www.googleapis.com/auth/youtube".to_string()],
            "abc123",
        )
        .unwrap();

        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        let has = |k: &str, v: &str| pairs.iter().any(|(pk, pv)| pk == k && pv == v);

        assert!(url.starts_with(AUTHORIZATION_ENDPOINT));
        assert!(has("client_id", "client-1"));
        assert!(has("response_type", "token"));
        assert!(has("prompt", "consent"));
        assert!(has("state", "abc123"));
        assert!(has("scope", "https://www.googleapis.com/auth/youtube"));
    }

    #[tokio::test]
    async fn test_complete_delivers_outcome() {
        let (callback, receiver) = consent_channel();
        assert!(callback.complete("ya29.x", "s1", Some(3599)));

        match receiver.await.unwrap() {
            ConsentOutcome::Granted {
                access_token,
                state,
                expires_in,
                ..
            } => {
                assert_eq!(access_token, "ya29.x");
                assert_eq!(state, "s1");
                assert_eq!(expires_in, Some(3599));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropped_callback_closes_channel() {
        let (callback, receiver) = consent_channel();
        drop(callback);
        assert!(receiver.await.is_err());
    }

    #[test]
    fn test_complete_after_receiver_dropped() {
        let (callback, receiver) = consent_channel();
        drop(receiver);
        assert!(!callback.deny("late"));
    }

    #[tokio::test]
    async fn test_redirect_with_token() {
        let (callback, receiver) = consent_channel();
        callback
            .complete_from_redirect(
                "http://127.0.0.1:8080/cb#access_token=ya29.abc&token_type=Bearer\
                 &expires_in=3599&state=xyz&scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fyoutube",
            )
            .unwrap();

        assert_eq!(
            receiver.await.unwrap(),
            ConsentOutcome::Granted {
                access_token: "ya29.abc".to_string(),
                state: "xyz".to_string(),
                expires_in: Some(3599),
                scopes: Some(vec!["https://www.googleapis.com/auth/youtube".to_string()]),
            }
        );
    }

    #[tokio::test]
    async fn test_redirect_with_error() {
        let (callback, receiver) = consent_channel();
        callback
            .complete_from_redirect("http://127.0.0.1:8080/cb?error=access_denied&state=xyz")
            .unwrap();

        assert_eq!(
            receiver.await.unwrap(),
            ConsentOutcome::Denied("access_denied".to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_redirect_denies() {
        let (callback, receiver) = consent_channel();
        let result = callback.complete_from_redirect("http://127.0.0.1:8080/cb#state=only");

        assert!(matches!(result, Err(AuthError::InvalidResponse(_))));
        assert!(matches!(receiver.await.unwrap(), ConsentOutcome::Denied(_)));
    }
}
