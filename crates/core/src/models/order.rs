//! Orders: immutable snapshots taken at checkout.
//!
//! An [`OrderItem`] freezes the unit price at purchase time, so later catalog
//! price changes never alter a placed order. There is no update path for
//! order items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{OrderId, OrderItemId, OrderStatus, Price, ProductId, Quantity, UserId};
use crate::validation::{
    Validate, ValidationError, require_non_empty, require_non_negative, require_quantity,
};

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub total: Price,
    pub shipping_address: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// `Σ quantity × frozen price` over the order's items.
    ///
    /// Equal to `total` for orders placed by this client.
    #[must_use]
    pub fn items_total(&self) -> Price {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

/// One product line of a placed order, with its purchase-time price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub price: Price,
}

impl OrderItem {
    /// Quantity times the frozen unit price.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Candidate for placing an order.
///
/// `userId` is taken from the session by the server and `status` starts at
/// `pending`, so neither is part of the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub shipping_address: String,
}

impl Validate for NewOrder {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_negative("total", self.total)?;
        require_non_empty("shippingAddress", &self.shipping_address)
    }
}

/// Candidate for one line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl Validate for NewOrderItem {
    fn validate(&self) -> Result<(), ValidationError> {
        require_quantity(self.quantity)?;
        require_non_negative("price", self.price)
    }
}
