//! Cart commands.
//!
//! Each mutation reports one notice, then the refreshed cart.

use std::sync::Arc;

use shopease_core::{Cart, CartItemId, ProductId, Quantity};
use shopease_storefront::{AppError, Notice, Storefront};

use crate::output;

pub async fn show(storefront: &Storefront) -> Result<(), AppError> {
    storefront.cart().refresh().await?;
    print_cart(storefront);
    Ok(())
}

pub async fn add(
    storefront: &Storefront,
    product_id: ProductId,
    quantity: u32,
) -> Result<(), AppError> {
    // The parser already refuses zero
    let quantity = Quantity::new(quantity).unwrap_or(Quantity::ONE);
    let cart = storefront.cart().add_item(product_id, quantity).await?;

    let name = cart
        .line_for_product(product_id)
        .map_or_else(|| format!("Product #{product_id}"), |line| line.product.name.clone());
    output::notice(&Notice::added_to_cart(&name));
    print_cart(storefront);
    Ok(())
}

pub async fn increment(storefront: &Storefront, item_id: CartItemId) -> Result<(), AppError> {
    refresh_before_mutation(storefront).await?;
    let cart = storefront.cart().increment(item_id).await?;
    report_quantity(storefront, &cart, item_id);
    Ok(())
}

pub async fn decrement(storefront: &Storefront, item_id: CartItemId) -> Result<(), AppError> {
    refresh_before_mutation(storefront).await?;
    let cart = storefront.cart().decrement(item_id).await?;
    report_quantity(storefront, &cart, item_id);
    Ok(())
}

pub async fn set(
    storefront: &Storefront,
    item_id: CartItemId,
    quantity: u32,
) -> Result<(), AppError> {
    refresh_before_mutation(storefront).await?;
    let cart = storefront.cart().set_quantity(item_id, quantity).await?;
    report_quantity(storefront, &cart, item_id);
    Ok(())
}

pub async fn remove(storefront: &Storefront, item_id: CartItemId) -> Result<(), AppError> {
    storefront.cart().remove_item(item_id).await?;
    output::notice(&Notice::item_removed());
    print_cart(storefront);
    Ok(())
}

/// Line mutations check the snapshot, so load it first when nothing has.
async fn refresh_before_mutation(storefront: &Storefront) -> Result<(), AppError> {
    if storefront.cart().snapshot().is_empty() {
        storefront.cart().refresh().await?;
    }
    Ok(())
}

fn report_quantity(storefront: &Storefront, cart: &Arc<Cart>, item_id: CartItemId) {
    let notice = cart
        .line(item_id)
        .map_or_else(Notice::item_removed, |line| {
            Notice::quantity_updated(line.quantity.get())
        });
    output::notice(&notice);
    print_cart(storefront);
}

fn print_cart(storefront: &Storefront) {
    let cart = storefront.cart().snapshot();
    output::cart(&cart, &storefront.checkout().summary());
}
