//! `reqwest`-backed gateway.
//!
//! The remote service owns the session, carried in a cookie, so the client
//! keeps a cookie store. Requests time out after the configured duration;
//! a timed-out request settles as [`GatewayError::Timeout`].

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{Span, debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::{Gateway, GatewayError, Method};
use crate::config::ApiConfig;

/// The HTTP header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Gateway over HTTP(S) to the store API.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<SecretString>,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    /// Create a gateway for the configured store.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(config.base_url.clone()),
            api_token: config.api_token.clone(),
        })
    }

    /// Resolve an absolute API path against the base URL.
    fn url_for(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| GatewayError::Transport(format!("invalid path {path}: {e}")))
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    #[instrument(skip(self, body), fields(method = %method, path = %path, request_id = tracing::field::Empty))]
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, GatewayError> {
        let url = self.url_for(path)?;
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let mut builder = self
            .client
            .request(to_reqwest(method), url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(REQUEST_ID_HEADER, &request_id);

        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let text = response.text().await.map_err(classify)?;

        if !status.is_success() {
            warn!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "Store API returned non-success status"
            );
            return Err(GatewayError::from_response(status.as_u16(), &text));
        }

        debug!(status = %status, bytes = text.len(), "Store API request succeeded");

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse store API response"
            );
            GatewayError::Decode(e.to_string())
        })
    }
}

const fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err.to_string())
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
