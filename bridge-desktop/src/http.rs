//! `HttpClient` backed by a pooled reqwest client

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("playlist-reorder/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One `execute` call is one round trip; statuses are never turned into errors here.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let built = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(USER_AGENT)
            .build();

        match built {
            Ok(client) => Self { client },
            Err(e) => {
                warn!(error = %e, "Could not configure HTTP client, using reqwest defaults");
                Self {
                    client: Client::new(),
                }
            }
        }
    }

    /// Wrap an already configured client (proxies, custom roots, ...)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn method_of(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn transport_error(e: reqwest::Error) -> BridgeError {
    if e.is_builder() {
        return BridgeError::OperationFailed(format!("malformed request: {}", e));
    }
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connect failed"
    } else {
        "transport error"
    };
    BridgeError::Network(format!("{}: {}", kind, e))
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            timeout,
        } = request;
        debug!(%method, %url, "Sending request");

        let mut builder = self.client.request(method_of(method), url.as_str());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(%method, %url, error = %e, "No response received");
            transport_error(e)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?;

        debug!(%method, status, bytes = body.len(), "Response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_methods_map_one_to_one() {
        for method in [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Delete,
        ] {
            assert_eq!(method_of(method).as_str(), method.as_str());
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error() {
        let client = ReqwestHttpClient::with_timeout(Duration::from_millis(500));
        let request = HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:9/playlists");

        let err = client.execute(request).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_retryable() {
        let client = ReqwestHttpClient::new();
        let request = HttpRequest::new(HttpMethod::Get, "not a url");

        let err = client.execute(request).await.unwrap_err();
        assert!(!err.is_network());
    }
}
