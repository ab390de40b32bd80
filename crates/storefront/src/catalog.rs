//! Product catalog: cached product reads and admin product edits.

use std::sync::Arc;

use shopease_core::{NewProduct, Product, ProductFilter, ProductId, Validate, ValidationError};
use thiserror::Error;
use tracing::{info, instrument};

use crate::error::add_breadcrumb;
use crate::gateway::{GatewayError, GatewayExt, Method};
use crate::queries::{QueryCache, QueryKey};
use crate::session::SessionStore;

const PRODUCTS_PATH: &str = "/api/products";

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Not logged in")]
    Unauthenticated,

    #[error("Only administrators can edit products")]
    Forbidden,

    #[error("Product {0} not found")]
    NotFound(ProductId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Catalog request failed: {0}")]
    Remote(#[from] GatewayError),
}

impl CatalogError {
    fn from_gateway(err: GatewayError, product_id: Option<ProductId>) -> Self {
        match (err.status(), product_id) {
            (Some(404), Some(id)) => Self::NotFound(id),
            (Some(401), _) => Self::Unauthenticated,
            (Some(403), _) => Self::Forbidden,
            _ => Self::Remote(err),
        }
    }
}

/// Product reads and admin edits.
#[derive(Debug, Clone)]
pub struct Catalog {
    queries: QueryCache,
    session: SessionStore,
}

impl Catalog {
    #[must_use]
    pub const fn new(queries: QueryCache, session: SessionStore) -> Self {
        Self { queries, session }
    }

    /// A single product, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, `Remote` otherwise.
    pub async fn product(&self, id: ProductId) -> Result<Arc<Product>, CatalogError> {
        self.queries
            .product(id)
            .await
            .map_err(|err| CatalogError::from_gateway(err, Some(id)))
    }

    /// Products matching `filter`, as the store evaluates it. Not cached.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the list cannot be fetched.
    #[instrument(skip(self))]
    pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        let path = if filter.is_empty() {
            PRODUCTS_PATH.to_string()
        } else {
            format!("{PRODUCTS_PATH}?{}", filter.to_query_string())
        };

        self.queries
            .gateway()
            .get(&path)
            .await
            .map_err(|err| CatalogError::from_gateway(err, None))
    }

    /// Create a product (admin only).
    ///
    /// # Errors
    ///
    /// `Unauthenticated`/`Forbidden` without an admin session and
    /// `Validation` for an invalid candidate, all without sending anything;
    /// `Remote` if the store refuses.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, CatalogError> {
        self.require_admin().await?;
        product.validate()?;

        let created: Product = self
            .queries
            .gateway()
            .send(Method::Post, PRODUCTS_PATH, product)
            .await
            .map_err(|err| CatalogError::from_gateway(err, None))?;

        self.queries.invalidate(QueryKey::Product(created.id)).await;
        add_breadcrumb("catalog", "Product created", None);
        info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    /// Replace a product (admin only).
    ///
    /// # Errors
    ///
    /// As [`Catalog::create_product`], plus `NotFound` for an unknown id.
    #[instrument(skip(self, product), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Product, CatalogError> {
        self.require_admin().await?;
        product.validate()?;

        let updated: Product = self
            .queries
            .gateway()
            .send(Method::Put, &format!("{PRODUCTS_PATH}/{id}"), product)
            .await
            .map_err(|err| CatalogError::from_gateway(err, Some(id)))?;

        self.queries.invalidate(QueryKey::Product(id)).await;
        let product_id = id.to_string();
        add_breadcrumb(
            "catalog",
            "Product updated",
            Some(&[("product_id", &product_id)]),
        );
        info!("Product updated");
        Ok(updated)
    }

    async fn require_admin(&self) -> Result<(), CatalogError> {
        match self.session.resolve().await {
            None => Err(CatalogError::Unauthenticated),
            Some(user) if !user.is_admin => Err(CatalogError::Forbidden),
            Some(_) => Ok(()),
        }
    }
}
