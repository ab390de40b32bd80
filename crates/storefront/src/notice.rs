//! User-facing outcome notices.
//!
//! Every mutating action reports exactly one outcome: a success notice built
//! by the caller, or the notice derived from the action's error.

use std::fmt;

use shopease_core::Order;

use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::checkout::CheckoutError;
use crate::error::AppError;
use crate::session::SessionError;

/// Visual weight of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoticeVariant {
    #[default]
    Default,
    Destructive,
}

/// A short title and description shown after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    fn success(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant: NoticeVariant::Default,
        }
    }

    fn failure(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }

    #[must_use]
    pub fn added_to_cart(product_name: &str) -> Self {
        Self::success("Added to cart", format!("{product_name} added to your cart"))
    }

    #[must_use]
    pub fn quantity_updated(quantity: u32) -> Self {
        Self::success("Cart updated", format!("Quantity set to {quantity}"))
    }

    #[must_use]
    pub fn item_removed() -> Self {
        Self::success("Item removed", "Item has been removed from your cart")
    }

    #[must_use]
    pub fn order_placed(order: &Order) -> Self {
        Self::success(
            "Order placed",
            format!("Order #{} for {} has been placed", order.id, order.total),
        )
    }

    #[must_use]
    pub fn logged_in(username: &str) -> Self {
        Self::success("Welcome back", format!("Logged in as {username}"))
    }

    #[must_use]
    pub fn registered(username: &str) -> Self {
        Self::success("Account created", format!("Welcome, {username}"))
    }

    #[must_use]
    pub fn logged_out() -> Self {
        Self::success("Logged out", "You have been logged out")
    }

    #[must_use]
    pub fn product_saved(name: &str) -> Self {
        Self::success("Product saved", format!("{name} has been saved"))
    }

    /// Whether this notice reports a failure.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        self.variant == NoticeVariant::Destructive
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

impl From<&CartError> for Notice {
    fn from(err: &CartError) -> Self {
        match err {
            CartError::Unauthenticated => {
                Self::failure("Login required", "Please login to add items to your cart")
            }
            CartError::InventoryExceeded { .. } => {
                Self::failure("Cannot add more", "No more items available in stock")
            }
            CartError::QuantityOutOfRange { max, .. } => Self::failure(
                "Invalid quantity",
                format!("Choose a quantity between 1 and {max}"),
            ),
            CartError::MutationInFlight(_) => {
                Self::failure("Please wait", "This item is still being updated")
            }
            CartError::NotFound(_) => Self::failure("Error", "Item is no longer in your cart"),
            CartError::RemoteMutationFailed { message, .. } => {
                Self::failure("Error", format!("Failed to update cart: {message}"))
            }
            CartError::Remote(_) => Self::failure("Error", "Failed to load your cart"),
        }
    }
}

impl From<&CheckoutError> for Notice {
    fn from(err: &CheckoutError) -> Self {
        match err {
            CheckoutError::Unauthenticated => {
                Self::failure("Login required", "Please login to check out")
            }
            CheckoutError::EmptyCart => Self::failure("Cart is empty", "Add items before checking out"),
            CheckoutError::InsufficientStock {
                product, inventory, ..
            } => Self::failure(
                "Not enough stock",
                format!("Only {inventory} of {product} available"),
            ),
            CheckoutError::Validation(err) => Self::failure("Invalid order", capitalize(&err.to_string())),
            CheckoutError::Remote(err) => {
                Self::failure("Error", format!("Failed to place order: {}", err.user_message()))
            }
        }
    }
}

impl From<&SessionError> for Notice {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::Validation(err) => Self::failure("Error", capitalize(&err.to_string())),
            SessionError::Rejected(message) => Self::failure("Error", message.clone()),
            SessionError::Remote(err) => Self::failure("Error", err.user_message()),
        }
    }
}

impl From<&CatalogError> for Notice {
    fn from(err: &CatalogError) -> Self {
        match err {
            CatalogError::Unauthenticated => Self::failure("Login required", "Please login first"),
            CatalogError::Forbidden => {
                Self::failure("Not allowed", "Only administrators can edit products")
            }
            CatalogError::NotFound(_) => Self::failure("Not found", "Product not found"),
            CatalogError::Validation(err) => Self::failure("Error", capitalize(&err.to_string())),
            CatalogError::Remote(err) => Self::failure("Error", err.user_message()),
        }
    }
}

impl From<&AppError> for Notice {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Cart(err) => err.into(),
            AppError::Checkout(err) => err.into(),
            AppError::Session(err) => err.into(),
            AppError::Catalog(err) => err.into(),
            AppError::Validation(err) => Self::failure("Error", capitalize(&err.to_string())),
            AppError::Gateway(err) => Self::failure("Error", err.user_message()),
            AppError::Config(err) => Self::failure("Configuration error", err.to_string()),
        }
    }
}

/// `username is required` reads as `Username is required`.
fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
