//! Carts and their line items.
//!
//! A [`Cart`] exclusively owns its lines. Its total is always derived from
//! those lines and never stored, so it cannot drift from them.

use serde::{Deserialize, Serialize};

use crate::models::Product;
use crate::types::{CartId, CartItemId, Price, ProductId, Quantity, UserId};
use crate::validation::{Validate, ValidationError, require_quantity};

/// A cart line as stored by the server (references the product by id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// Candidate for creating a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCart {
    pub user_id: UserId,
}

impl Validate for NewCart {
    fn validate(&self) -> Result<(), ValidationError> {
        // The owner is type-checked by deserialization; nothing else to check.
        Ok(())
    }
}

/// Candidate for adding a product to a cart.
///
/// `quantity` stays signed here: this is the raw request shape, checked by
/// [`Validate`] before it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

impl NewCartItem {
    /// Candidate for `quantity` units of `product_id`.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

impl Validate for NewCartItem {
    fn validate(&self) -> Result<(), ValidationError> {
        require_quantity(self.quantity)
    }
}

/// A cart line hydrated with its product, as served by `GET /api/cart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartItemId,
    pub product: Product,
    pub quantity: Quantity,
}

impl CartLine {
    /// Quantity times the product's current price.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }

    /// Whether the line respects `quantity <= product.inventory`.
    #[must_use]
    pub const fn is_within_stock(&self) -> bool {
        self.quantity.get() <= self.product.inventory
    }

    /// Whether one more unit would still fit under the inventory ceiling.
    #[must_use]
    pub const fn can_increment(&self) -> bool {
        self.quantity.get() < self.product.inventory
    }
}

/// A user's cart.
///
/// Lines keep the order the server returned them in (insertion order). Any
/// `total` field in the server payload is ignored; see [`Cart::total`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    pub id: Option<CartId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub items: Vec<CartLine>,
}

impl Cart {
    /// An empty cart with no identity (anonymous or not yet created).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// `Σ quantity × price` over the current lines, recomputed on every call.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Find a line by id.
    #[must_use]
    pub fn line(&self, id: CartItemId) -> Option<&CartLine> {
        self.items.iter().find(|line| line.id == id)
    }

    /// Find the first line referencing `product_id`.
    #[must_use]
    pub fn line_for_product(&self, product_id: ProductId) -> Option<&CartLine> {
        self.items.iter().find(|line| line.product.id == product_id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Lines whose quantity exceeds their product's inventory.
    ///
    /// Non-empty only when the server reports stock that dropped below an
    /// existing line.
    pub fn overstocked_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.items.iter().filter(|line| !line.is_within_stock())
    }
}
