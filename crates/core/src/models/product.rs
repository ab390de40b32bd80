//! Catalog products.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};
use crate::validation::{
    Validate, ValidationError, require_non_empty, require_non_negative,
};

/// Inventory at or below which a product is flagged as low stock.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// A product as served by the store.
///
/// `inventory` is the hard ceiling for any cart quantity referencing this
/// product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    pub category: String,
    pub inventory: u32,
}

impl Product {
    /// Whether at least one unit can be purchased.
    #[must_use]
    pub const fn is_in_stock(&self) -> bool {
        self.inventory > 0
    }

    /// Whether the product is in stock but close to selling out.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.inventory > 0 && self.inventory <= LOW_STOCK_THRESHOLD
    }

    /// Badge shown next to the product, if its stock warrants one.
    #[must_use]
    pub const fn stock_label(&self) -> Option<&'static str> {
        if !self.is_in_stock() {
            Some("Out of Stock")
        } else if self.is_low_stock() {
            Some("Low Stock")
        } else {
            None
        }
    }
}

/// Candidate for creating or replacing a product (admin only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    pub category: String,
    #[serde(default)]
    pub inventory: i32,
}

impl Validate for NewProduct {
    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("description", &self.description)?;
        require_non_empty("category", &self.category)?;
        require_non_negative("price", self.price)?;
        if self.inventory < 0 {
            return Err(ValidationError::NegativeInventory(self.inventory));
        }
        Ok(())
    }
}
