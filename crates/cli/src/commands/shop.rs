//! Catalog and checkout commands.

use shopease_core::{ProductFilter, ProductId};
use shopease_storefront::{AppError, Notice, Storefront};
use tracing::debug;

use crate::output;

pub async fn product(storefront: &Storefront, id: ProductId) -> Result<(), AppError> {
    let product = storefront.catalog().product(id).await?;
    output::product(&product);
    Ok(())
}

pub async fn products(
    storefront: &Storefront,
    category: Option<String>,
    search: Option<String>,
    in_stock: bool,
) -> Result<(), AppError> {
    let filter = ProductFilter {
        category,
        search_query: search,
        in_stock: in_stock.then_some(true),
        ..ProductFilter::default()
    };
    debug!(?filter, "Listing products");

    let products = storefront.catalog().products(&filter).await?;
    output::products(&products);
    Ok(())
}

/// Place an order for the store's current view of the cart.
pub async fn checkout(storefront: &Storefront, address: &str) -> Result<(), AppError> {
    storefront.cart().refresh().await?;
    let order = storefront.checkout().place_order(address).await?;
    output::notice(&Notice::order_placed(&order));
    Ok(())
}

pub async fn orders(storefront: &Storefront) -> Result<(), AppError> {
    let orders = storefront.checkout().orders().await?;
    output::orders(&orders);
    Ok(())
}
