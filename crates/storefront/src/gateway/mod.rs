//! Remote data gateway.
//!
//! # Architecture
//!
//! - One operation: `request(method, path, body?)`, JSON in and JSON out
//! - Transport and error classification only; no business logic
//! - No retries and no caching; those belong to callers (see [`crate::queries`])
//!
//! Every higher component talks to the store through [`Gateway`], so the
//! cart engine and session store run against a stub in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopease_storefront::gateway::{Gateway, HttpGateway, Method};
//!
//! let gateway = HttpGateway::new(&config.api)?;
//! let cart = gateway.request(Method::Get, "/api/cart", None).await?;
//! ```

mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use http::{HttpGateway, REQUEST_ID_HEADER};

/// Maximum number of characters of a raw response body kept in an error.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// HTTP-like request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// The method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a [`Gateway`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The store answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Human-readable message taken from the response body when present.
        message: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request did not settle before the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Classify a non-success response.
    ///
    /// A JSON body contributes its `message` (or `error`) field; a plain
    /// text body contributes its trimmed text. Otherwise the message is a
    /// generic one naming the status.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let body = body.trim();

        let generic = || format!("Request failed with status {status}");

        let message = match serde_json::from_str::<Value>(body) {
            Ok(json) => ["message", "error"]
                .iter()
                .filter_map(|key| json.get(key).and_then(Value::as_str))
                .find(|m| !m.trim().is_empty())
                .map_or_else(generic, |m| m.trim().to_owned()),
            Err(_) if body.is_empty() => generic(),
            Err(_) => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        };

        Self::Status { status, message }
    }

    /// The HTTP status, when the store answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The store reports the referenced entity as absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }

    /// The store refused the request for lack of a (sufficient) session.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// The failure happened below the HTTP layer and a repeat may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }

    /// The message to show a user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Timeout => "The store did not respond in time".to_string(),
            Self::Transport(_) => "Could not reach the store".to_string(),
            Self::Decode(_) => "The store sent an unexpected response".to_string(),
        }
    }
}

/// Request/response access to the remote store.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send `body` (if any) to `path` with `method`.
    ///
    /// Paths are absolute (`/api/cart`) and may carry a query string. A
    /// successful response with an empty body yields [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] for non-success responses and transport or
    /// decoding failures.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, GatewayError>;
}

/// A gateway shared between the components of a storefront.
pub type SharedGateway = Arc<dyn Gateway>;

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for Arc<G> {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, GatewayError> {
        (**self).request(method, path, body).await
    }
}

/// Typed helpers over [`Gateway::request`].
#[async_trait]
pub trait GatewayExt: Gateway {
    /// `GET` `path` and decode the body as `T`.
    ///
    /// # Errors
    ///
    /// Returns the request's [`GatewayError`], or `Decode` on a shape mismatch.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        decode(self.request(Method::Get, path, None).await?)
    }

    /// Send `body` to `path` with `method` and decode the response as `T`.
    ///
    /// # Errors
    ///
    /// Returns the request's [`GatewayError`], or `Decode` on a shape mismatch.
    async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = encode(body)?;
        decode(self.request(method, path, Some(body)).await?)
    }
}

impl<G: Gateway + ?Sized> GatewayExt for G {}

/// Decode a response body into a typed value.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] if the body does not match `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Encode a typed request body.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] if `body` cannot be represented as JSON.
pub fn encode<B: Serialize>(body: &B) -> Result<Value, GatewayError> {
    serde_json::to_value(body).map_err(|e| GatewayError::Decode(e.to_string()))
}
