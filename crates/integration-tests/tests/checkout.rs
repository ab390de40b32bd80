//! Checkout against the HTTP store.

#![allow(clippy::unwrap_used)]

use shopease_core::{LoginCredentials, OrderStatus, Price, Quantity};
use shopease_integration_tests::TestStore;
use shopease_storefront::Storefront;
use shopease_storefront::checkout::CheckoutError;

async fn logged_in(store: &TestStore) -> Storefront {
    store.add_account("alice", "secret", false);
    let storefront = store.storefront();
    storefront
        .login(&LoginCredentials::new("alice", "secret"))
        .await
        .unwrap();
    storefront
}

#[tokio::test]
async fn test_order_freezes_prices_and_empties_cart() {
    let store = TestStore::start().await;
    let mug = store.add_product("Mug", 1250, 5);
    let storefront = logged_in(&store).await;
    storefront
        .cart()
        .add_item(mug, Quantity::new(2).unwrap())
        .await
        .unwrap();

    let summary = storefront.checkout().summary();
    assert_eq!(summary.total, Price::from_cents(2500));
    assert!(summary.is_free_shipping());

    let order = storefront
        .checkout()
        .place_order("1 Main St")
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, Price::from_cents(2500));
    assert_eq!(order.items_total(), order.total);
    assert!(storefront.cart().snapshot().is_empty());

    let orders = storefront.checkout().orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders.first().unwrap().shipping_address, "1 Main St");
}

#[tokio::test]
async fn test_empty_cart_is_refused_locally() {
    let store = TestStore::start().await;
    let storefront = logged_in(&store).await;

    assert!(matches!(
        storefront.checkout().place_order("1 Main St").await,
        Err(CheckoutError::EmptyCart)
    ));
    assert_eq!(store.count("POST", "/api/orders"), 0);
}

#[tokio::test]
async fn test_stock_sold_elsewhere_blocks_checkout() {
    let store = TestStore::start().await;
    let mug = store.add_product("Mug", 1250, 5);
    let storefront = logged_in(&store).await;
    storefront
        .cart()
        .add_item(mug, Quantity::new(4).unwrap())
        .await
        .unwrap();

    store.set_inventory(mug, 1);
    storefront.cart().refresh().await.unwrap();

    assert!(matches!(
        storefront.checkout().place_order("1 Main St").await,
        Err(CheckoutError::InsufficientStock { inventory: 1, .. })
    ));
    assert_eq!(store.count("POST", "/api/orders"), 0);
}

#[tokio::test]
async fn test_anonymous_checkout_and_history_are_refused() {
    let store = TestStore::start().await;
    let storefront = store.storefront();

    assert!(matches!(
        storefront.checkout().place_order("1 Main St").await,
        Err(CheckoutError::Unauthenticated)
    ));
    assert!(matches!(
        storefront.checkout().orders().await,
        Err(CheckoutError::Unauthenticated)
    ));
}
