//! In-memory store used by unit tests.
//!
//! Implements [`Gateway`] directly, so tests run without a transport. Every
//! request is recorded, failures can be injected ahead of time, and a request
//! can be held open to exercise in-flight behavior.

#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use shopease_core::{
    Cart, CartItemId, CartLine, NewProduct, Price, Product, ProductFilter, ProductId, Quantity,
    SessionUser, UserId,
};
use tokio::sync::{Notify, oneshot};

use crate::gateway::{Gateway, GatewayError, Method};

/// The password every fake account accepts.
pub const PASSWORD: &str = "secret";

#[derive(Default)]
struct State {
    products: Vec<Product>,
    lines: Vec<CartLine>,
    user: Option<SessionUser>,
    orders: Vec<Value>,
    next_item_id: i32,
    duplicate_lines: bool,
    calls: Vec<(Method, String)>,
    failures: VecDeque<GatewayError>,
    hold: Option<(Method, oneshot::Receiver<()>)>,
}

/// Recording in-memory store.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
    /// Notified when a held request starts waiting.
    pub entered: Notify,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_product(&self, id: i32, name: &str, cents: u32, inventory: u32) {
        self.state().products.push(Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: format!("{name} description"),
            price: Price::from_cents(cents),
            image_url: None,
            category: "Kitchen".to_string(),
            inventory,
        });
    }

    pub fn set_inventory(&self, id: i32, inventory: u32) {
        let mut state = self.state();
        for product in &mut state.products {
            if product.id == ProductId::new(id) {
                product.inventory = inventory;
            }
        }
        for line in &mut state.lines {
            if line.product.id == ProductId::new(id) {
                line.product.inventory = inventory;
            }
        }
    }

    /// Start a session without going through `/api/auth/login`.
    pub fn sign_in(&self, username: &str, is_admin: bool) {
        self.state().user = Some(SessionUser {
            id: UserId::new(7),
            username: username.to_string(),
            is_admin,
        });
    }

    /// Insert a cart line directly, returning its id.
    pub fn put_line(&self, product_id: i32, quantity: u32) -> CartItemId {
        let mut state = self.state();
        let product = state
            .products
            .iter()
            .find(|p| p.id == ProductId::new(product_id))
            .cloned()
            .unwrap();
        state.next_item_id += 1;
        let id = CartItemId::new(state.next_item_id);
        state.lines.push(CartLine {
            id,
            product,
            quantity: Quantity::new(quantity).unwrap(),
        });
        id
    }

    /// Add-to-cart creates a new line even when the product is present.
    pub fn use_duplicate_lines(&self) {
        self.state().duplicate_lines = true;
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.state().lines.clone()
    }

    /// Queue a failure returned by the next request instead of handling it.
    pub fn fail_next(&self, err: GatewayError) {
        self.state().failures.push_back(err);
    }

    /// Hold back the response to the next request with `method` until the
    /// returned sender fires (or is dropped).
    pub fn hold_next(&self, method: Method) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state().hold = Some((method, rx));
        tx
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|(m, p)| *m == method && p == path)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    fn handle(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, GatewayError> {
        let mut state = self.state();
        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        let segments: Vec<&str> = route.trim_matches('/').split('/').collect();

        match (method, segments.as_slice()) {
            (Method::Get, ["api", "auth", "session"]) => Ok(json!({ "user": state.user })),
            (Method::Post, ["api", "auth", "login"]) => {
                let username = field_str(body, "username");
                if field_str(body, "password") != PASSWORD {
                    return Err(reject(401, "Invalid username or password"));
                }
                let user = SessionUser {
                    id: UserId::new(7),
                    is_admin: username == "admin",
                    username,
                };
                state.user = Some(user.clone());
                Ok(serde_json::to_value(user).unwrap())
            }
            (Method::Post, ["api", "auth", "register"]) => {
                let username = field_str(body, "username");
                if username == "taken" {
                    return Err(reject(400, "Username already exists"));
                }
                let user = SessionUser {
                    id: UserId::new(8),
                    username,
                    is_admin: false,
                };
                state.user = Some(user.clone());
                Ok(serde_json::to_value(user).unwrap())
            }
            (Method::Post, ["api", "auth", "logout"]) => {
                state.user = None;
                Ok(Value::Null)
            }
            (Method::Get, ["api", "cart"]) => {
                let user = state.user.clone().ok_or_else(|| reject(401, "Not authenticated"))?;
                let cart = Cart {
                    id: Some(shopease_core::CartId::new(1)),
                    user_id: Some(user.id),
                    items: state.lines.clone(),
                };
                let mut value = serde_json::to_value(cart).unwrap();
                // A stale server-side total must never be trusted.
                value["total"] = json!(999_999);
                Ok(value)
            }
            (Method::Post, ["api", "cart", "items"]) => {
                if state.user.is_none() {
                    return Err(reject(401, "Not authenticated"));
                }
                let product_id = ProductId::new(field_i64(body, "productId") as i32);
                let quantity = field_i64(body, "quantity") as u32;
                let product = state
                    .products
                    .iter()
                    .find(|p| p.id == product_id)
                    .cloned()
                    .ok_or_else(|| reject(404, "Product not found"))?;

                let merge = !state.duplicate_lines;
                if let Some(line) = state
                    .lines
                    .iter_mut()
                    .find(|l| merge && l.product.id == product_id)
                {
                    let total = line.quantity.get() + quantity;
                    if total > product.inventory {
                        return Err(reject(400, "Not enough stock"));
                    }
                    line.quantity = Quantity::new(total).unwrap();
                    return Ok(json!({ "id": line.id, "quantity": total }));
                }

                if quantity > product.inventory {
                    return Err(reject(400, "Not enough stock"));
                }
                state.next_item_id += 1;
                let id = CartItemId::new(state.next_item_id);
                state.lines.push(CartLine {
                    id,
                    product,
                    quantity: Quantity::new(quantity).map_err(|_| reject(400, "Invalid quantity"))?,
                });
                Ok(json!({ "id": id, "quantity": quantity }))
            }
            (Method::Put, ["api", "cart", "items", id]) => {
                let id: CartItemId = id.parse().map_err(|_| reject(400, "Invalid id"))?;
                let quantity = field_i64(body, "quantity");
                let line = state
                    .lines
                    .iter_mut()
                    .find(|l| l.id == id)
                    .ok_or_else(|| reject(404, "Cart item not found"))?;
                if quantity < 1 || quantity > i64::from(line.product.inventory) {
                    return Err(reject(400, "Not enough stock"));
                }
                line.quantity = Quantity::new(quantity as u32).unwrap();
                Ok(json!({ "id": id, "quantity": quantity }))
            }
            (Method::Delete, ["api", "cart", "items", id]) => {
                let id: CartItemId = id.parse().map_err(|_| reject(400, "Invalid id"))?;
                let before = state.lines.len();
                state.lines.retain(|l| l.id != id);
                if state.lines.len() == before {
                    return Err(reject(404, "Cart item not found"));
                }
                Ok(Value::Null)
            }
            (Method::Get, ["api", "products"]) => {
                let filter = parse_filter(query);
                let products: Vec<&Product> =
                    state.products.iter().filter(|p| filter.matches(p)).collect();
                Ok(serde_json::to_value(products).unwrap())
            }
            (Method::Get, ["api", "products", id]) => {
                let id: ProductId = id.parse().map_err(|_| reject(400, "Invalid id"))?;
                state
                    .products
                    .iter()
                    .find(|p| p.id == id)
                    .map(|p| serde_json::to_value(p).unwrap())
                    .ok_or_else(|| reject(404, "Product not found"))
            }
            (Method::Post | Method::Put, ["api", "products", rest @ ..]) => {
                if !state.user.as_ref().is_some_and(|u| u.is_admin) {
                    return Err(reject(403, "Forbidden"));
                }
                let candidate: NewProduct =
                    serde_json::from_value(body.cloned().unwrap_or_default()).unwrap();
                let id = match rest {
                    [id] => id.parse().map_err(|_| reject(400, "Invalid id"))?,
                    _ => ProductId::new(i32::try_from(state.products.len()).unwrap() + 1),
                };
                let product = Product {
                    id,
                    name: candidate.name,
                    description: candidate.description,
                    price: Price::new(candidate.price).unwrap(),
                    image_url: candidate.image_url,
                    category: candidate.category,
                    inventory: u32::try_from(candidate.inventory).unwrap(),
                };
                state.products.retain(|p| p.id != id);
                state.products.push(product.clone());
                Ok(serde_json::to_value(product).unwrap())
            }
            (Method::Post, ["api", "orders"]) => {
                let user = state.user.clone().ok_or_else(|| reject(401, "Not authenticated"))?;
                if state.lines.is_empty() {
                    return Err(reject(400, "Cart is empty"));
                }
                let id = state.orders.len() + 1;
                let items: Vec<Value> = state
                    .lines
                    .iter()
                    .enumerate()
                    .map(|(n, line)| {
                        json!({
                            "id": n + 1,
                            "orderId": id,
                            "productId": line.product.id,
                            "quantity": line.quantity,
                            "price": line.product.price,
                        })
                    })
                    .collect();
                let order = json!({
                    "id": id,
                    "userId": user.id,
                    "status": "pending",
                    "createdAt": "2024-05-01T12:00:00Z",
                    "total": field(body, "total"),
                    "shippingAddress": field_str(body, "shippingAddress"),
                    "items": items,
                });
                state.orders.push(order.clone());
                state.lines.clear();
                Ok(order)
            }
            (Method::Get, ["api", "orders"]) => {
                if state.user.is_none() {
                    return Err(reject(401, "Not authenticated"));
                }
                Ok(Value::Array(state.orders.clone()))
            }
            _ => Err(reject(404, "Not found")),
        }
    }
}

#[async_trait]
impl Gateway for FakeStore {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, GatewayError> {
        let (failure, hold) = {
            let mut state = self.state();
            state.calls.push((method, path.to_string()));
            let hold = match state.hold.take() {
                Some((held, rx)) if held == method => Some(rx),
                other => {
                    state.hold = other;
                    None
                }
            };
            (state.failures.pop_front(), hold)
        };

        // The store answers as of arrival; only delivery is held back.
        let response = match failure {
            Some(err) => Err(err),
            None => self.handle(method, path, body.as_ref()),
        };

        if let Some(rx) = hold {
            self.entered.notify_one();
            let _ = rx.await;
        }

        response
    }
}

fn reject(status: u16, message: &str) -> GatewayError {
    GatewayError::from_response(status, &json!({ "message": message }).to_string())
}

fn field(body: Option<&Value>, key: &str) -> Value {
    body.and_then(|b| b.get(key)).cloned().unwrap_or(Value::Null)
}

fn field_str(body: Option<&Value>, key: &str) -> String {
    field(body, key).as_str().unwrap_or_default().to_string()
}

fn field_i64(body: Option<&Value>, key: &str) -> i64 {
    field(body, key).as_i64().unwrap_or_default()
}

fn parse_filter(query: &str) -> ProductFilter {
    let mut filter = ProductFilter::default();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "category" => filter.category = Some(value.into_owned()),
            "searchQuery" => filter.search_query = Some(value.into_owned()),
            "priceMin" => filter.price_min = value.parse::<Decimal>().ok(),
            "priceMax" => filter.price_max = value.parse::<Decimal>().ok(),
            "inStock" => filter.in_stock = Some(value == "true"),
            _ => {}
        }
    }
    filter
}
