//! Query cache over the store API.
//!
//! Holds the client's cached view of the session, the cart and individual
//! products. Reads go through the cache; writers invalidate the keys their
//! mutation touched and refetch.
//!
//! # Caching Strategy
//!
//! - Concurrent reads of one key share a single outstanding request
//! - Products expire after the configured TTL (default 5 minutes)
//! - Session and cart live until explicitly invalidated
//! - A read that fails below the HTTP layer is retried once
//!
//! The `refetch_*` methods skip coalescing: a caller that just mutated the
//! cart must not join a load that started before its mutation landed.

mod cache;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use shopease_core::{Cart, Product, ProductId, SessionPayload, SessionUser};
use tracing::{debug, instrument, warn};

use crate::gateway::{Gateway, GatewayError, Method, SharedGateway, decode};

use cache::QueryExpiry;
pub use cache::{CacheValue, QueryKey};

pub(crate) const SESSION_PATH: &str = "/api/auth/session";
pub(crate) const CART_PATH: &str = "/api/cart";

const MAX_ENTRIES: u64 = 1000;

/// Cached, invalidatable reads against the store.
#[derive(Clone)]
pub struct QueryCache {
    gateway: SharedGateway,
    cache: Cache<QueryKey, CacheValue>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl QueryCache {
    /// Create a cache reading through `gateway`.
    #[must_use]
    pub fn new(gateway: SharedGateway, product_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .expire_after(QueryExpiry { product_ttl })
            .build();

        Self { gateway, cache }
    }

    /// The gateway this cache reads through.
    #[must_use]
    pub const fn gateway(&self) -> &SharedGateway {
        &self.gateway
    }

    /// The current session's user, `None` when anonymous.
    ///
    /// # Errors
    ///
    /// Returns the gateway error if the session cannot be fetched.
    pub async fn session(&self) -> Result<Option<SessionUser>, GatewayError> {
        let value = self
            .cache
            .try_get_with(QueryKey::Session, fetch_session(self.gateway.as_ref()))
            .await
            .map_err(unshare)?;

        match value {
            CacheValue::Session(user) => Ok(user),
            _ => Err(unexpected(QueryKey::Session)),
        }
    }

    /// The current cart; empty for an anonymous session.
    ///
    /// # Errors
    ///
    /// Returns the gateway error if the cart cannot be fetched.
    pub async fn cart(&self) -> Result<Arc<Cart>, GatewayError> {
        let value = self
            .cache
            .try_get_with(QueryKey::Cart, fetch_cart(self.gateway.as_ref()))
            .await
            .map_err(unshare)?;

        match value {
            CacheValue::Cart(cart) => Ok(cart),
            _ => Err(unexpected(QueryKey::Cart)),
        }
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns the gateway error if the product cannot be fetched (404 when
    /// it does not exist).
    pub async fn product(&self, id: ProductId) -> Result<Arc<Product>, GatewayError> {
        let key = QueryKey::Product(id);
        if self.cache.contains_key(&key) {
            debug!(product_id = %id, "Cache hit for product");
        }

        let value = self
            .cache
            .try_get_with(key, fetch_product(self.gateway.as_ref(), id))
            .await
            .map_err(unshare)?;

        match value {
            CacheValue::Product(product) => Ok(product),
            _ => Err(unexpected(key)),
        }
    }

    /// Drop the cached session and fetch it again.
    ///
    /// # Errors
    ///
    /// Returns the gateway error if the session cannot be fetched.
    #[instrument(skip(self))]
    pub async fn refetch_session(&self) -> Result<Option<SessionUser>, GatewayError> {
        self.cache.invalidate(&QueryKey::Session).await;
        let value = fetch_session(self.gateway.as_ref()).await?;
        self.cache.insert(QueryKey::Session, value.clone()).await;

        match value {
            CacheValue::Session(user) => Ok(user),
            _ => Err(unexpected(QueryKey::Session)),
        }
    }

    /// Drop the cached cart and fetch it again.
    ///
    /// # Errors
    ///
    /// Returns the gateway error if the cart cannot be fetched.
    #[instrument(skip(self))]
    pub async fn refetch_cart(&self) -> Result<Arc<Cart>, GatewayError> {
        self.cache.invalidate(&QueryKey::Cart).await;
        let value = fetch_cart(self.gateway.as_ref()).await?;
        self.cache.insert(QueryKey::Cart, value.clone()).await;

        match value {
            CacheValue::Cart(cart) => Ok(cart),
            _ => Err(unexpected(QueryKey::Cart)),
        }
    }

    /// Invalidate one cached query.
    pub async fn invalidate(&self, key: QueryKey) {
        debug!(?key, "Invalidating query");
        self.cache.invalidate(&key).await;
    }

    /// Whether `key` currently has a live cached value.
    #[must_use]
    pub fn is_cached(&self, key: QueryKey) -> bool {
        self.cache.contains_key(&key)
    }
}

/// `GET` with one retry on transport failures and timeouts.
///
/// Status failures are answers from the store and are returned as-is.
async fn get_with_retry(gateway: &dyn Gateway, path: &str) -> Result<Value, GatewayError> {
    match gateway.request(Method::Get, path, None).await {
        Err(err) if err.is_retryable() => {
            warn!(path, error = %err, "Read failed, retrying once");
            gateway.request(Method::Get, path, None).await
        }
        result => result,
    }
}

async fn fetch_session(gateway: &dyn Gateway) -> Result<CacheValue, GatewayError> {
    let body = get_with_retry(gateway, SESSION_PATH).await?;
    let payload: SessionPayload = if body.is_null() {
        SessionPayload::default()
    } else {
        decode(body)?
    };
    Ok(CacheValue::Session(payload.user))
}

async fn fetch_cart(gateway: &dyn Gateway) -> Result<CacheValue, GatewayError> {
    let cart = match get_with_retry(gateway, CART_PATH).await {
        Ok(Value::Null) => Cart::empty(),
        Ok(body) => decode(body)?,
        Err(err) if err.status() == Some(401) => {
            debug!("No session, reading cart as empty");
            Cart::empty()
        }
        Err(err) => return Err(err),
    };
    Ok(CacheValue::Cart(Arc::new(cart)))
}

async fn fetch_product(gateway: &dyn Gateway, id: ProductId) -> Result<CacheValue, GatewayError> {
    let body = get_with_retry(gateway, &format!("/api/products/{id}")).await?;
    let product: Product = decode(body)?;
    Ok(CacheValue::Product(Arc::new(product)))
}

#[allow(clippy::needless_pass_by_value)] // Signature required by map_err
fn unshare(err: Arc<GatewayError>) -> GatewayError {
    (*err).clone()
}

fn unexpected(key: QueryKey) -> GatewayError {
    GatewayError::Decode(format!("cached value for {key:?} has the wrong type"))
}
