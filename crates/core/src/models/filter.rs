//! Catalog filter descriptor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Product;

/// A pure predicate over products.
///
/// Carries no state and no validation beyond its types; an inverted price
/// range simply matches nothing. The store interprets it server-side from
/// the query string, and [`ProductFilter::matches`] evaluates it locally.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_min: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
}

impl ProductFilter {
    /// Whether no criterion is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.search_query.is_none()
            && self.in_stock.is_none()
    }

    /// Render as a URL query string (without the leading `?`).
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(category) = &self.category {
            query.append_pair("category", category);
        }
        if let Some(min) = self.price_min {
            query.append_pair("priceMin", &min.to_string());
        }
        if let Some(max) = self.price_max {
            query.append_pair("priceMax", &max.to_string());
        }
        if let Some(search) = &self.search_query {
            query.append_pair("searchQuery", search);
        }
        if let Some(in_stock) = self.in_stock {
            query.append_pair("inStock", if in_stock { "true" } else { "false" });
        }
        query.finish()
    }

    /// Evaluate the filter against a product.
    ///
    /// The search query matches case-insensitively against name and
    /// description.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let price = product.price.amount();

        if let Some(category) = &self.category
            && !product.category.eq_ignore_ascii_case(category)
        {
            return false;
        }
        if self.price_min.is_some_and(|min| price < min) {
            return false;
        }
        if self.price_max.is_some_and(|max| price > max) {
            return false;
        }
        if let Some(search) = &self.search_query {
            let needle = search.to_lowercase();
            if !product.name.to_lowercase().contains(&needle)
                && !product.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(in_stock) = self.in_stock {
            return product.is_in_stock() == in_stock;
        }
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Price, ProductId};

    fn product(name: &str, cents: u32, inventory: u32) -> Product {
        Product {
            id: ProductId::new(1),
            name: name.to_string(),
            description: "A fine thing".to_string(),
            price: Price::from_cents(cents),
            image_url: None,
            category: "Kitchen".to_string(),
            inventory,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = ProductFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&product("Mug", 500, 0)));
        assert_eq!(filter.to_query_string(), "");
    }

    #[test]
    fn test_price_range_and_stock() {
        let filter = ProductFilter {
            price_min: Some(Decimal::new(3, 0)),
            price_max: Some(Decimal::new(10, 0)),
            in_stock: Some(true),
            ..ProductFilter::default()
        };
        assert!(filter.matches(&product("Mug", 500, 2)));
        assert!(!filter.matches(&product("Mug", 500, 0)));
        assert!(!filter.matches(&product("Mug", 1500, 2)));
        assert!(!filter.matches(&product("Mug", 200, 2)));
    }

    #[test]
    fn test_search_and_category() {
        let filter = ProductFilter {
            category: Some("kitchen".to_string()),
            search_query: Some("MUG".to_string()),
            ..ProductFilter::default()
        };
        assert!(filter.matches(&product("Blue mug", 500, 1)));
        assert!(!filter.matches(&product("Teapot", 500, 1)));
    }

    #[test]
    fn test_query_string_is_encoded() {
        let filter = ProductFilter {
            category: Some("Home & Garden".to_string()),
            in_stock: Some(false),
            ..ProductFilter::default()
        };
        assert_eq!(
            filter.to_query_string(),
            "category=Home+%26+Garden&inStock=false"
        );
    }
}
