//! Cache types for store API responses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use shopease_core::{Cart, Product, ProductId, SessionUser};

/// Cache key for query results.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum QueryKey {
    Session,
    Cart,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Session(Option<SessionUser>),
    Cart(Arc<Cart>),
    Product(Arc<Product>),
}

/// Products expire after a fixed lifetime; session and cart entries live
/// until they are invalidated.
pub(super) struct QueryExpiry {
    pub(super) product_ttl: Duration,
}

impl Expiry<QueryKey, CacheValue> for QueryExpiry {
    fn expire_after_create(
        &self,
        key: &QueryKey,
        _value: &CacheValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        match key {
            QueryKey::Product(_) => Some(self.product_ttl),
            QueryKey::Session | QueryKey::Cart => None,
        }
    }
}
