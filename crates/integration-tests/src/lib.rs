//! End-to-end tests for the ShopEase storefront client.
//!
//! [`TestStore`] serves the store API from an in-process `axum` router bound
//! to `127.0.0.1:0`, and [`TestStore::storefront`] wires a real
//! [`Storefront`] (HTTP gateway, cookie session) against it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopease-integration-tests
//! ```
//!
//! # Test-only routes
//!
//! - `/test/status/{code}` - answers with `code` and a JSON message
//! - `/test/slow` - answers after two seconds
//! - `/test/garbage` - answers 200 with a body that is not JSON

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, RawQuery, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post, put},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use shopease_core::{
    Cart, CartId, CartItemId, CartLine, LoginCredentials, NewCartItem, NewOrder, NewProduct,
    NewUser, Order, OrderId, OrderItem, OrderItemId, OrderStatus, Price, Product, ProductFilter,
    ProductId, Quantity, SessionPayload, SessionUser, UserId,
};
use shopease_storefront::gateway::REQUEST_ID_HEADER;
use shopease_storefront::{Storefront, StorefrontConfig};
use tokio::task::JoinHandle;
use url::Url;

/// Name of the session cookie the store hands out.
pub const SESSION_COOKIE: &str = "shopease_session";

struct Account {
    user: SessionUser,
    password: String,
}

#[derive(Default)]
struct StoreState {
    products: Vec<Product>,
    accounts: Vec<Account>,
    sessions: HashMap<String, UserId>,
    carts: HashMap<UserId, Vec<CartLine>>,
    orders: Vec<Order>,
    next_user_id: i32,
    next_item_id: i32,
    requests: Vec<RecordedRequest>,
}

impl StoreState {
    fn user_for(&self, headers: &HeaderMap) -> Option<SessionUser> {
        let token = session_token(headers)?;
        let user_id = self.sessions.get(&token)?;
        self.accounts
            .iter()
            .find(|a| a.user.id == *user_id)
            .map(|a| a.user.clone())
    }

    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Cart lines carry the product as it is now, not as it was when added.
    fn cart_for(&self, user_id: UserId) -> Cart {
        let items = self
            .carts
            .get(&user_id)
            .into_iter()
            .flatten()
            .map(|line| CartLine {
                product: self.product(line.product.id).cloned().unwrap_or_else(|| line.product.clone()),
                ..line.clone()
            })
            .collect();
        Cart {
            id: Some(CartId::new(user_id.as_i32())),
            user_id: Some(user_id),
            items,
        }
    }

    fn start_session(&mut self, user_id: UserId) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions.insert(token.clone(), user_id);
        token
    }
}

/// A request as the store received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub request_id: Option<String>,
}

type SharedState = Arc<Mutex<StoreState>>;

/// A store error: status plus `{ "message": ... }`.
struct StoreError(StatusCode, &'static str);

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "message": self.1 }))).into_response()
    }
}

type StoreResult<T> = Result<T, StoreError>;

const UNAUTHENTICATED: StoreError = StoreError(StatusCode::UNAUTHORIZED, "Not authenticated");

/// An in-process store API.
pub struct TestStore {
    base_url: Url,
    state: SharedState,
    server: JoinHandle<()>,
}

impl TestStore {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> Self {
        let state = SharedState::default();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            state,
            server,
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap()
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Client configuration pointing at this store.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig::for_base_url(self.base_url.clone())
    }

    /// A fresh client with its own cookie jar.
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        Storefront::new(self.config()).unwrap()
    }

    pub fn add_product(&self, name: &str, cents: u32, inventory: u32) -> ProductId {
        let mut state = self.state();
        let id = ProductId::new(i32::try_from(state.products.len()).unwrap() + 1);
        state.products.push(Product {
            id,
            name: name.to_string(),
            description: format!("A {name}"),
            price: Price::from_cents(cents),
            image_url: None,
            category: "Kitchen".to_string(),
            inventory,
        });
        id
    }

    pub fn set_inventory(&self, id: ProductId, inventory: u32) {
        if let Some(product) = self.state().products.iter_mut().find(|p| p.id == id) {
            product.inventory = inventory;
        }
    }

    pub fn add_account(&self, username: &str, password: &str, is_admin: bool) -> UserId {
        let mut state = self.state();
        state.next_user_id += 1;
        let id = UserId::new(state.next_user_id);
        state.accounts.push(Account {
            user: SessionUser {
                id,
                username: username.to_string(),
                is_admin,
            },
            password: password.to_string(),
        });
        id
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    /// Requests with `method` whose path (without query) equals `path`.
    #[must_use]
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }
}

impl Drop for TestStore {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/auth/session", get(session))
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(logout))
        .route("/api/cart", get(cart))
        .route("/api/cart/items", post(add_item))
        .route("/api/cart/items/{id}", put(update_item).delete(remove_item))
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/{id}", get(product).put(update_product))
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/test/status/{code}", get(status))
        .route("/test/slow", get(slow))
        .route("/test/garbage", get(garbage))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        request_id: request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };
    state.lock().unwrap().requests.push(recorded);
    next.run(request).await
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly")
}

// =============================================================================
// Auth
// =============================================================================

async fn session(State(state): State<SharedState>, headers: HeaderMap) -> Json<SessionPayload> {
    let user = state.lock().unwrap().user_for(&headers);
    Json(SessionPayload { user })
}

async fn login(
    State(state): State<SharedState>,
    Json(credentials): Json<LoginCredentials>,
) -> StoreResult<impl IntoResponse> {
    let mut state = state.lock().unwrap();
    let user = state
        .accounts
        .iter()
        .find(|a| a.user.username == credentials.username && a.password == credentials.password)
        .map(|a| a.user.clone())
        .ok_or(StoreError(StatusCode::UNAUTHORIZED, "Invalid username or password"))?;

    let token = state.start_session(user.id);
    Ok((AppendHeaders([(header::SET_COOKIE, session_cookie(&token))]), Json(user)))
}

async fn register(
    State(state): State<SharedState>,
    Json(new_user): Json<NewUser>,
) -> StoreResult<impl IntoResponse> {
    let mut state = state.lock().unwrap();
    if state.accounts.iter().any(|a| a.user.username == new_user.username) {
        return Err(StoreError(StatusCode::BAD_REQUEST, "Username already exists"));
    }

    state.next_user_id += 1;
    let user = SessionUser {
        id: UserId::new(state.next_user_id),
        username: new_user.username,
        is_admin: false,
    };
    state.accounts.push(Account {
        user: user.clone(),
        password: new_user.password,
    });

    let token = state.start_session(user.id);
    Ok((
        StatusCode::CREATED,
        AppendHeaders([(header::SET_COOKIE, session_cookie(&token))]),
        Json(user),
    ))
}

async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        state.lock().unwrap().sessions.remove(&token);
    }
    (
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, format!("{SESSION_COOKIE}=; Path=/; Max-Age=0"))]),
    )
}

// =============================================================================
// Cart
// =============================================================================

async fn cart(State(state): State<SharedState>, headers: HeaderMap) -> StoreResult<Response> {
    let state = state.lock().unwrap();
    let user = state.user_for(&headers).ok_or(UNAUTHENTICATED)?;
    let mut body = serde_json::to_value(state.cart_for(user.id)).unwrap();
    // Clients derive the total; a stale one here must not show through.
    body["total"] = json!(0);
    Ok(Json(body).into_response())
}

async fn add_item(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(item): Json<NewCartItem>,
) -> StoreResult<Response> {
    let mut state = state.lock().unwrap();
    let user = state.user_for(&headers).ok_or(UNAUTHENTICATED)?;
    let product = state
        .product(item.product_id)
        .cloned()
        .ok_or(StoreError(StatusCode::NOT_FOUND, "Product not found"))?;
    let quantity = u32::try_from(item.quantity)
        .ok()
        .and_then(|q| Quantity::new(q).ok())
        .ok_or(StoreError(StatusCode::BAD_REQUEST, "Invalid quantity"))?;

    state.next_item_id += 1;
    let next_id = CartItemId::new(state.next_item_id);
    let lines = state.carts.entry(user.id).or_default();

    let line = if let Some(line) = lines.iter_mut().find(|l| l.product.id == product.id) {
        let total = line.quantity.get() + quantity.get();
        if total > product.inventory {
            return Err(StoreError(StatusCode::BAD_REQUEST, "Not enough stock"));
        }
        line.quantity = Quantity::new(total).unwrap();
        line.clone()
    } else {
        if quantity.get() > product.inventory {
            return Err(StoreError(StatusCode::BAD_REQUEST, "Not enough stock"));
        }
        let line = CartLine {
            id: next_id,
            product,
            quantity,
        };
        lines.push(line.clone());
        line
    };

    Ok((StatusCode::CREATED, Json(json!({ "id": line.id, "quantity": line.quantity }))).into_response())
}

#[derive(Deserialize)]
struct QuantityBody {
    quantity: i64,
}

async fn update_item(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<CartItemId>,
    Json(body): Json<QuantityBody>,
) -> StoreResult<Response> {
    let mut state = state.lock().unwrap();
    let user = state.user_for(&headers).ok_or(UNAUTHENTICATED)?;
    let inventory = state
        .carts
        .get(&user.id)
        .and_then(|lines| lines.iter().find(|l| l.id == id))
        .map(|line| state.product(line.product.id).map_or(0, |p| p.inventory))
        .ok_or(StoreError(StatusCode::NOT_FOUND, "Cart item not found"))?;

    let quantity = u32::try_from(body.quantity)
        .ok()
        .filter(|q| *q <= inventory)
        .and_then(|q| Quantity::new(q).ok())
        .ok_or(StoreError(StatusCode::BAD_REQUEST, "Not enough stock"))?;

    let line = state
        .carts
        .get_mut(&user.id)
        .and_then(|lines| lines.iter_mut().find(|l| l.id == id))
        .ok_or(StoreError(StatusCode::NOT_FOUND, "Cart item not found"))?;
    line.quantity = quantity;
    Ok(Json(json!({ "id": id, "quantity": quantity })).into_response())
}

async fn remove_item(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<CartItemId>,
) -> StoreResult<StatusCode> {
    let mut state = state.lock().unwrap();
    let user = state.user_for(&headers).ok_or(UNAUTHENTICATED)?;
    let lines = state.carts.entry(user.id).or_default();
    let before = lines.len();
    lines.retain(|l| l.id != id);
    if lines.len() == before {
        return Err(StoreError(StatusCode::NOT_FOUND, "Cart item not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Catalog
// =============================================================================

fn parse_filter(query: Option<&str>) -> ProductFilter {
    let mut filter = ProductFilter::default();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
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

async fn list_products(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> Json<Vec<Product>> {
    let filter = parse_filter(query.as_deref());
    let state = state.lock().unwrap();
    Json(
        state
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect(),
    )
}

async fn product(
    State(state): State<SharedState>,
    Path(id): Path<ProductId>,
) -> StoreResult<Json<Product>> {
    state
        .lock()
        .unwrap()
        .product(id)
        .cloned()
        .map(Json)
        .ok_or(StoreError(StatusCode::NOT_FOUND, "Product not found"))
}

fn save_product(
    state: &mut StoreState,
    headers: &HeaderMap,
    id: Option<ProductId>,
    candidate: NewProduct,
) -> StoreResult<Product> {
    let user = state.user_for(headers).ok_or(UNAUTHENTICATED)?;
    if !user.is_admin {
        return Err(StoreError(StatusCode::FORBIDDEN, "Admin access required"));
    }

    let id = match id {
        Some(id) if state.product(id).is_none() => {
            return Err(StoreError(StatusCode::NOT_FOUND, "Product not found"));
        }
        Some(id) => id,
        None => ProductId::new(i32::try_from(state.products.len()).unwrap() + 1),
    };
    let product = Product {
        id,
        name: candidate.name,
        description: candidate.description,
        price: Price::new(candidate.price)
            .map_err(|_| StoreError(StatusCode::BAD_REQUEST, "Invalid price"))?,
        image_url: candidate.image_url,
        category: candidate.category,
        inventory: u32::try_from(candidate.inventory)
            .map_err(|_| StoreError(StatusCode::BAD_REQUEST, "Invalid inventory"))?,
    };
    state.products.retain(|p| p.id != id);
    state.products.push(product.clone());
    Ok(product)
}

async fn create_product(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(candidate): Json<NewProduct>,
) -> StoreResult<(StatusCode, Json<Product>)> {
    let mut state = state.lock().unwrap();
    let product = save_product(&mut state, &headers, None, candidate)?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<ProductId>,
    Json(candidate): Json<NewProduct>,
) -> StoreResult<Json<Product>> {
    let mut state = state.lock().unwrap();
    save_product(&mut state, &headers, Some(id), candidate).map(Json)
}

// =============================================================================
// Orders
// =============================================================================

async fn create_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(candidate): Json<NewOrder>,
) -> StoreResult<(StatusCode, Json<Order>)> {
    let mut state = state.lock().unwrap();
    let user = state.user_for(&headers).ok_or(UNAUTHENTICATED)?;
    let cart = state.cart_for(user.id);
    if cart.is_empty() {
        return Err(StoreError(StatusCode::BAD_REQUEST, "Cart is empty"));
    }
    if cart.overstocked_lines().next().is_some() {
        return Err(StoreError(StatusCode::BAD_REQUEST, "Not enough stock"));
    }

    let order_id = OrderId::new(i32::try_from(state.orders.len()).unwrap() + 1);
    let items = cart
        .items
        .iter()
        .zip(1..)
        .map(|(line, n)| OrderItem {
            id: OrderItemId::new(n),
            order_id,
            product_id: line.product.id,
            quantity: line.quantity,
            price: line.product.price,
        })
        .collect();

    for line in &cart.items {
        if let Some(product) = state.products.iter_mut().find(|p| p.id == line.product.id) {
            product.inventory -= line.quantity.get();
        }
    }

    let order = Order {
        id: order_id,
        user_id: user.id,
        status: OrderStatus::Pending,
        created_at: chrono::Utc::now(),
        total: Price::new(candidate.total)
            .map_err(|_| StoreError(StatusCode::BAD_REQUEST, "Invalid total"))?,
        shipping_address: candidate.shipping_address,
        items,
    };
    state.orders.push(order.clone());
    state.carts.remove(&user.id);
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> StoreResult<Json<Vec<Order>>> {
    let state = state.lock().unwrap();
    let user = state.user_for(&headers).ok_or(UNAUTHENTICATED)?;
    Ok(Json(
        state
            .orders
            .iter()
            .filter(|o| o.user_id == user.id)
            .cloned()
            .collect(),
    ))
}

// =============================================================================
// Test-only routes
// =============================================================================

async fn status(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "message": format!("Status {code}") }))).into_response()
}

async fn slow() -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "ok": true }))
}

async fn garbage() -> &'static str {
    "this is not json"
}
