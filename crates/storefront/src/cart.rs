//! Cart consistency engine.
//!
//! The engine keeps the last cart the store returned and treats it as the
//! only truth. Mutations are sent, then the cart is invalidated and fetched
//! again; nothing is patched locally. Quantities are checked against the
//! snapshot before anything is sent, so requests that the inventory ceiling
//! would refuse never leave the client.
//!
//! # Concurrency
//!
//! - At most one mutation per cart item is in flight; a second is refused
//!   with [`CartError::MutationInFlight`]. Different items may be mutated
//!   concurrently.
//! - The in-flight flag is released on success, failure and cancellation
//!   (it is held by a guard that lives until the refetch settles).
//! - Refetches are numbered; a refetch only replaces the snapshot if no
//!   later one has already done so.
//! - No lock is held across an `.await`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::json;
use shopease_core::{Cart, CartItemId, CartLine, Price, ProductId, Quantity};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::error::add_breadcrumb;
use crate::gateway::{GatewayError, Method};
use crate::queries::QueryCache;
use crate::session::SessionStore;

const ITEMS_PATH: &str = "/api/cart/items";

/// Errors from cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// There is no session; nothing was sent.
    #[error("Not logged in")]
    Unauthenticated,

    /// The requested quantity is outside `1..=max`; nothing was sent.
    #[error("Quantity {requested} is out of range (1 to {max})")]
    QuantityOutOfRange { requested: u32, max: u32 },

    /// The line already holds every unit in stock; nothing was sent.
    #[error("Only {inventory} in stock")]
    InventoryExceeded { inventory: u32 },

    /// Another mutation of the same item has not settled yet.
    #[error("Cart item {0} is already being updated")]
    MutationInFlight(CartItemId),

    /// The store refused or failed the mutation. The snapshot is unchanged.
    #[error("Cart update failed: {message}")]
    RemoteMutationFailed {
        /// HTTP status, absent when no response arrived.
        status: Option<u16>,
        message: String,
    },

    /// The item is not in the cart.
    #[error("Cart item {0} not found")]
    NotFound(CartItemId),

    /// The mutation landed but the cart could not be fetched again.
    #[error("Failed to load cart: {0}")]
    Remote(#[from] GatewayError),
}

impl CartError {
    /// Classify a failed mutation request.
    fn from_mutation(err: GatewayError, item_id: Option<CartItemId>) -> Self {
        match item_id {
            _ if err.is_unauthorized() => Self::Unauthenticated,
            Some(id) if err.is_not_found() => Self::NotFound(id),
            _ => Self::RemoteMutationFailed {
                status: err.status(),
                message: err.user_message(),
            },
        }
    }
}

/// Sum of `quantity × price` over the cart's lines.
#[must_use]
pub fn derived_total(cart: &Cart) -> Price {
    cart.total()
}

struct Snapshot {
    seq: u64,
    cart: Arc<Cart>,
}

struct CartInner {
    queries: QueryCache,
    session: SessionStore,
    snapshot: RwLock<Snapshot>,
    fetch_seq: AtomicU64,
    in_flight: Mutex<HashSet<CartItemId>>,
}

/// The cart consistency engine.
///
/// Cheap to clone; clones share the snapshot and the in-flight set.
#[derive(Clone)]
pub struct CartEngine {
    inner: Arc<CartInner>,
}

impl std::fmt::Debug for CartEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartEngine")
            .field("lines", &self.snapshot().items.len())
            .field("in_flight", &self.in_flight().len())
            .finish_non_exhaustive()
    }
}

/// Marks an item as updating until dropped.
struct MutationGuard<'a> {
    in_flight: &'a Mutex<HashSet<CartItemId>>,
    item_id: CartItemId,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.item_id);
    }
}

impl CartEngine {
    /// Create an engine with an empty snapshot.
    #[must_use]
    pub fn new(queries: QueryCache, session: SessionStore) -> Self {
        Self {
            inner: Arc::new(CartInner {
                queries,
                session,
                snapshot: RwLock::new(Snapshot {
                    seq: 0,
                    cart: Arc::new(Cart::empty()),
                }),
                fetch_seq: AtomicU64::new(0),
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// The last cart fetched, without I/O.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Cart> {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cart
            .clone()
    }

    /// Invalidate the cart, fetch it, and replace the snapshot.
    ///
    /// Returns the snapshot after the fetch (a newer one if a later refresh
    /// finished first).
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] if the fetch fails; the snapshot is
    /// left as it was.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<Cart>, CartError> {
        let seq = self.inner.fetch_seq.fetch_add(1, Ordering::AcqRel) + 1;
        let cart = self.inner.queries.refetch_cart().await?;
        Ok(self.commit(seq, cart))
    }

    /// Drop the snapshot without I/O, superseding any fetch still running.
    ///
    /// Used when the identity behind the cart is gone.
    pub fn clear(&self) -> Arc<Cart> {
        let seq = self.inner.fetch_seq.fetch_add(1, Ordering::AcqRel) + 1;
        self.commit(seq, Arc::new(Cart::empty()))
    }

    fn commit(&self, seq: u64, cart: Arc<Cart>) -> Arc<Cart> {
        let mut snapshot = self
            .inner
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if seq > snapshot.seq {
            snapshot.seq = seq;
            snapshot.cart = cart;
        } else {
            debug!(seq, latest = snapshot.seq, "Discarding superseded cart fetch");
        }
        snapshot.cart.clone()
    }

    /// Add `quantity` units of a product.
    ///
    /// Merging with an existing line is left to the store; the snapshot
    /// reflects whatever it decides.
    ///
    /// # Errors
    ///
    /// - [`CartError::Unauthenticated`] without a session (nothing sent)
    /// - [`CartError::RemoteMutationFailed`] if the store refuses, e.g. when
    ///   stock runs out
    /// - [`CartError::Remote`] if the refetch fails
    #[instrument(skip(self), fields(product_id = %product_id, quantity = quantity.get()))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Arc<Cart>, CartError> {
        if self.inner.session.resolve().await.is_none() {
            return Err(CartError::Unauthenticated);
        }

        let product = product_id.to_string();
        add_breadcrumb("cart", "Add to cart", Some(&[("product_id", &product)]));

        self.inner
            .queries
            .gateway()
            .request(
                Method::Post,
                ITEMS_PATH,
                Some(json!({ "productId": product_id, "quantity": quantity })),
            )
            .await
            .map_err(|err| mutation_failed("add_item", err, None))?;

        info!("Added to cart");
        self.refresh().await
    }

    /// Set an item's quantity.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotFound`] if the item is not in the snapshot, or the
    ///   store no longer has it
    /// - [`CartError::QuantityOutOfRange`] outside `1..=inventory`
    /// - [`CartError::MutationInFlight`] while the item is updating
    /// - [`CartError::RemoteMutationFailed`] if the store refuses
    /// - [`CartError::Remote`] if the refetch fails
    ///
    /// The first three send nothing.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn set_quantity(
        &self,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Arc<Cart>, CartError> {
        let line = self.line(item_id).ok_or(CartError::NotFound(item_id))?;
        let inventory = line.product.inventory;
        let quantity = Quantity::new(quantity)
            .ok()
            .filter(|q| q.get() <= inventory)
            .ok_or(CartError::QuantityOutOfRange {
                requested: quantity,
                max: inventory,
            })?;

        let _guard = self.begin(item_id)?;
        let item = item_id.to_string();
        let requested = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Update quantity",
            Some(&[("item_id", &item), ("quantity", &requested)]),
        );

        self.inner
            .queries
            .gateway()
            .request(
                Method::Put,
                &item_path(item_id),
                Some(json!({ "quantity": quantity })),
            )
            .await
            .map_err(|err| mutation_failed("set_quantity", err, Some(item_id)))?;

        info!(quantity = quantity.get(), "Quantity updated");
        self.refresh().await
    }

    /// One more unit.
    ///
    /// # Errors
    ///
    /// [`CartError::InventoryExceeded`] at the stock ceiling (nothing sent),
    /// otherwise as [`CartEngine::set_quantity`].
    pub async fn increment(&self, item_id: CartItemId) -> Result<Arc<Cart>, CartError> {
        let line = self.line(item_id).ok_or(CartError::NotFound(item_id))?;
        if !line.can_increment() {
            return Err(CartError::InventoryExceeded {
                inventory: line.product.inventory,
            });
        }
        self.set_quantity(item_id, line.quantity.get() + 1).await
    }

    /// One unit fewer; taking away the last unit removes the line.
    ///
    /// A line holding more than is in stock drops straight to the stock
    /// level, or is removed when nothing is left.
    ///
    /// # Errors
    ///
    /// As [`CartEngine::set_quantity`] or [`CartEngine::remove_item`].
    pub async fn decrement(&self, item_id: CartItemId) -> Result<Arc<Cart>, CartError> {
        let line = self.line(item_id).ok_or(CartError::NotFound(item_id))?;
        let target = line
            .quantity
            .decrement()
            .map(|q| q.get().min(line.product.inventory))
            .filter(|q| *q > 0);
        match target {
            Some(quantity) => self.set_quantity(item_id, quantity).await,
            None => self.remove_item(item_id).await,
        }
    }

    /// Remove an item. Removing an item the store no longer has succeeds.
    ///
    /// # Errors
    ///
    /// - [`CartError::MutationInFlight`] while the item is updating
    /// - [`CartError::RemoteMutationFailed`] if the store refuses
    /// - [`CartError::Remote`] if the refetch fails
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_item(&self, item_id: CartItemId) -> Result<Arc<Cart>, CartError> {
        let _guard = self.begin(item_id)?;
        let item = item_id.to_string();
        add_breadcrumb("cart", "Remove item", Some(&[("item_id", &item)]));

        match self
            .inner
            .queries
            .gateway()
            .request(Method::Delete, &item_path(item_id), None)
            .await
        {
            Ok(_) => info!("Item removed"),
            Err(err) if err.is_not_found() => debug!("Item already removed"),
            Err(err) => return Err(mutation_failed("remove_item", err, None)),
        }

        self.refresh().await
    }

    /// Whether a mutation of the item is in flight.
    #[must_use]
    pub fn is_updating(&self, item_id: CartItemId) -> bool {
        self.in_flight().contains(&item_id)
    }

    /// Whether an increment control for the item should be enabled.
    #[must_use]
    pub fn can_increment(&self, item_id: CartItemId) -> bool {
        self.line(item_id)
            .is_some_and(|line| line.can_increment() && !self.is_updating(item_id))
    }

    /// Whether a decrement control for the item should be enabled.
    #[must_use]
    pub fn can_decrement(&self, item_id: CartItemId) -> bool {
        self.line(item_id).is_some() && !self.is_updating(item_id)
    }

    /// Total units in the snapshot (the cart badge).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.snapshot().item_count()
    }

    /// Derived total of the snapshot.
    #[must_use]
    pub fn total(&self) -> Price {
        derived_total(&self.snapshot())
    }

    fn line(&self, item_id: CartItemId) -> Option<CartLine> {
        self.snapshot().line(item_id).cloned()
    }

    fn in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<CartItemId>> {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, item_id: CartItemId) -> Result<MutationGuard<'_>, CartError> {
        if !self.in_flight().insert(item_id) {
            debug!(item_id = %item_id, "Refusing concurrent mutation");
            return Err(CartError::MutationInFlight(item_id));
        }
        Ok(MutationGuard {
            in_flight: &self.inner.in_flight,
            item_id,
        })
    }
}

fn mutation_failed(operation: &str, err: GatewayError, item_id: Option<CartItemId>) -> CartError {
    error!(operation, error = %err, "Cart mutation failed");
    CartError::from_mutation(err, item_id)
}

fn item_path(item_id: CartItemId) -> String {
    format!("{ITEMS_PATH}/{item_id}")
}
