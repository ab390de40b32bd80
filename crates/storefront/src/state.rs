//! Client state shared by every view.

use std::sync::Arc;

use shopease_core::{LoginCredentials, NewUser, SessionUser};
use tracing::warn;

use crate::cart::CartEngine;
use crate::catalog::Catalog;
use crate::checkout::Checkout;
use crate::config::StorefrontConfig;
use crate::gate::{Gated, RouteClass, guard};
use crate::gateway::{GatewayError, HttpGateway, SharedGateway};
use crate::queries::QueryCache;
use crate::session::{SessionError, SessionStore};

/// The storefront client: one query cache, session store and cart engine
/// behind a single handle.
///
/// This struct is cheaply cloneable via `Arc`; clones share all state.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    queries: QueryCache,
    session: SessionStore,
    cart: CartEngine,
    catalog: Catalog,
    checkout: Checkout,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .field("session", &self.inner.session)
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Create a storefront talking HTTP to the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, GatewayError> {
        let gateway = HttpGateway::new(&config.api)?;
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    /// Create a storefront over any gateway.
    #[must_use]
    pub fn with_gateway(config: StorefrontConfig, gateway: SharedGateway) -> Self {
        let queries = QueryCache::new(gateway, config.api.product_cache_ttl);
        let session = SessionStore::new(queries.clone());
        let cart = CartEngine::new(queries.clone(), session.clone());
        let catalog = Catalog::new(queries.clone(), session.clone());
        let checkout = Checkout::new(queries.clone(), session.clone(), cart.clone());

        Self {
            inner: Arc::new(StorefrontInner {
                config,
                queries,
                session,
                cart,
                catalog,
                checkout,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn queries(&self) -> &QueryCache {
        &self.inner.queries
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartEngine {
        &self.inner.cart
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }

    /// Log in and load the new user's cart.
    ///
    /// # Errors
    ///
    /// See [`SessionStore::login`]. A cart that fails to load is logged, not
    /// returned.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<SessionUser, SessionError> {
        let user = self.inner.session.login(credentials).await?;
        self.reload_cart().await;
        Ok(user)
    }

    /// Register and load the (empty) cart.
    ///
    /// # Errors
    ///
    /// See [`SessionStore::register`].
    pub async fn register(&self, new_user: &NewUser) -> Result<SessionUser, SessionError> {
        let user = self.inner.session.register(new_user).await?;
        self.reload_cart().await;
        Ok(user)
    }

    /// Log out and drop the previous user's cart.
    ///
    /// The cart snapshot is cleared even when the store cannot be reached,
    /// since the session has been dropped locally either way.
    ///
    /// # Errors
    ///
    /// See [`SessionStore::logout`].
    pub async fn logout(&self) -> Result<(), SessionError> {
        let result = self.inner.session.logout().await;
        self.inner.cart.clear();
        result?;
        self.reload_cart().await;
        Ok(())
    }

    /// Resolve the session and gate `path`, building the view only when
    /// access is allowed.
    pub async fn navigate<V, F>(&self, path: &str, view: F) -> Gated<V>
    where
        F: FnOnce() -> V,
    {
        self.inner.session.resolve().await;
        guard(RouteClass::for_path(path), &self.inner.session.state(), view)
    }

    async fn reload_cart(&self) {
        if let Err(err) = self.inner.cart.refresh().await {
            warn!(error = %err, "Failed to reload cart");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::gate::RedirectTarget;
    use crate::testing::{FakeStore, PASSWORD};

    fn storefront(fake: &Arc<FakeStore>) -> Storefront {
        let config = StorefrontConfig::for_base_url(Url::parse("http://127.0.0.1:5000").unwrap());
        Storefront::with_gateway(config, fake.clone())
    }

    #[tokio::test]
    async fn test_login_loads_cart_and_logout_clears_it() {
        let fake = FakeStore::new();
        fake.add_product(1, "Mug", 1200, 5);
        fake.put_line(1, 2);
        let storefront = storefront(&fake);

        storefront
            .login(&LoginCredentials::new("alice", PASSWORD))
            .await
            .unwrap();
        assert_eq!(storefront.cart().item_count(), 2);

        storefront.logout().await.unwrap();
        assert_eq!(storefront.cart().item_count(), 0);
        assert!(storefront.cart().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_failed_logout_still_drops_the_cart() {
        let fake = FakeStore::new();
        fake.add_product(1, "Mug", 1200, 5);
        fake.put_line(1, 2);
        let storefront = storefront(&fake);
        storefront
            .login(&LoginCredentials::new("alice", PASSWORD))
            .await
            .unwrap();
        assert_eq!(storefront.cart().item_count(), 2);

        fake.fail_next(GatewayError::Timeout);
        let err = storefront.logout().await.unwrap_err();
        assert!(matches!(err, SessionError::Remote(GatewayError::Timeout)));
        assert_eq!(storefront.cart().item_count(), 0);
        assert_eq!(storefront.cart().total(), shopease_core::Price::ZERO);
    }

    #[tokio::test]
    async fn test_navigation_is_gated() {
        let fake = FakeStore::new();
        let storefront = storefront(&fake);

        assert_eq!(
            storefront.navigate("/checkout", || "checkout").await,
            Gated::Redirect(RedirectTarget::Login)
        );
        assert_eq!(
            storefront.navigate("/products/new", || "new").await,
            Gated::Redirect(RedirectTarget::Home)
        );
        assert_eq!(
            storefront.navigate("/products", || "list").await,
            Gated::Render("list")
        );

        storefront
            .login(&LoginCredentials::new("admin", PASSWORD))
            .await
            .unwrap();
        assert_eq!(
            storefront.navigate("/products/3/edit", || "edit").await,
            Gated::Render("edit")
        );
    }
}
