//! Checkout and order history.

use rust_decimal::Decimal;
use shopease_core::{Cart, CartItemId, NewOrder, Order, Price, Validate, ValidationError};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::cart::{CartEngine, derived_total};
use crate::error::add_breadcrumb;
use crate::gateway::{GatewayError, GatewayExt, Method};
use crate::queries::QueryCache;
use crate::session::SessionStore;

const ORDERS_PATH: &str = "/api/orders";

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Not logged in")]
    Unauthenticated,

    #[error("Your cart is empty")]
    EmptyCart,

    /// A line asks for more units than are in stock.
    #[error("Only {inventory} of {product} in stock")]
    InsufficientStock {
        item_id: CartItemId,
        product: String,
        inventory: u32,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Checkout failed: {0}")]
    Remote(#[from] GatewayError),
}

impl CheckoutError {
    fn from_gateway(err: GatewayError) -> Self {
        if err.is_unauthorized() {
            Self::Unauthenticated
        } else {
            Self::Remote(err)
        }
    }
}

/// Amounts shown before an order is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub subtotal: Price,
    /// Always free.
    pub shipping: Price,
    pub total: Price,
}

impl OrderSummary {
    #[must_use]
    pub fn for_cart(cart: &Cart) -> Self {
        let subtotal = derived_total(cart);
        let shipping = Price::ZERO;
        Self {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }

    /// Whether shipping costs nothing.
    #[must_use]
    pub fn is_free_shipping(&self) -> bool {
        self.shipping.amount() == Decimal::ZERO
    }
}

/// Places orders from the cart snapshot.
#[derive(Debug, Clone)]
pub struct Checkout {
    queries: QueryCache,
    session: SessionStore,
    cart: CartEngine,
}

impl Checkout {
    #[must_use]
    pub const fn new(queries: QueryCache, session: SessionStore, cart: CartEngine) -> Self {
        Self {
            queries,
            session,
            cart,
        }
    }

    /// Summary of the current cart snapshot.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary::for_cart(&self.cart.snapshot())
    }

    /// Place an order for everything in the cart.
    ///
    /// The store empties the cart; the snapshot is refreshed afterwards. A
    /// failed refresh is logged and does not fail the order.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `EmptyCart`, `InsufficientStock` and `Validation`
    /// are decided locally without sending anything; `Remote` if the store
    /// refuses the order.
    #[instrument(skip(self, shipping_address))]
    pub async fn place_order(&self, shipping_address: &str) -> Result<Order, CheckoutError> {
        if self.session.resolve().await.is_none() {
            return Err(CheckoutError::Unauthenticated);
        }

        let cart = self.cart.snapshot();
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if let Some(line) = cart.overstocked_lines().next() {
            return Err(CheckoutError::InsufficientStock {
                item_id: line.id,
                product: line.product.name.clone(),
                inventory: line.product.inventory,
            });
        }

        let order = NewOrder {
            total: OrderSummary::for_cart(&cart).total.amount(),
            shipping_address: shipping_address.trim().to_string(),
        };
        order.validate()?;

        let placed: Order = self
            .queries
            .gateway()
            .send(Method::Post, ORDERS_PATH, &order)
            .await
            .map_err(CheckoutError::from_gateway)?;

        let order_id = placed.id.to_string();
        add_breadcrumb("checkout", "Order placed", Some(&[("order_id", &order_id)]));
        info!(order_id = %placed.id, total = %placed.total, "Order placed");

        if let Err(err) = self.cart.refresh().await {
            warn!(error = %err, "Cart refresh after checkout failed");
        }
        Ok(placed)
    }

    /// The signed-in user's orders.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without a session, `Remote` otherwise.
    pub async fn orders(&self) -> Result<Vec<Order>, CheckoutError> {
        self.queries
            .gateway()
            .get(ORDERS_PATH)
            .await
            .map_err(CheckoutError::from_gateway)
    }
}
