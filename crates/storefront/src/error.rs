//! Unified error handling with Sentry integration.
//!
//! Every component owns a focused error enum; [`AppError`] unifies them for
//! callers that drive several components (the CLI, an embedding UI). Faults
//! on the store's side are captured to Sentry; refusals caused by the user's
//! own input are not.

use shopease_core::ValidationError;
use thiserror::Error;

use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::session::SessionError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A store request failed outside any component.
    #[error("Store error: {0}")]
    Gateway(#[from] GatewayError),

    /// Input was rejected before any request was sent.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// A session operation failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// A catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),
}

impl AppError {
    /// Whether the failure lies with the store or the client setup rather
    /// than with the user's request.
    #[must_use]
    pub fn is_server_fault(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Gateway(err) => is_store_fault(err),
            Self::Validation(_) => false,
            Self::Cart(err) => match err {
                CartError::RemoteMutationFailed { status, .. } => status.is_none_or(|s| s >= 500),
                CartError::Remote(err) => is_store_fault(err),
                _ => false,
            },
            Self::Session(SessionError::Remote(err))
            | Self::Catalog(CatalogError::Remote(err))
            | Self::Checkout(CheckoutError::Remote(err)) => is_store_fault(err),
            Self::Session(_) | Self::Catalog(_) | Self::Checkout(_) => false,
        }
    }

    /// Report the error: server faults go to Sentry and the error log.
    pub fn capture(&self) {
        if self.is_server_fault() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "Request refused");
        }
    }
}

/// Transport failures, timeouts, undecodable bodies and 5xx answers.
fn is_store_fault(err: &GatewayError) -> bool {
    err.status().is_none_or(|status| status >= 500)
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Quantity changed", Some(&[("item_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
