//! Domain models shared by the storefront client and its tools.
//!
//! Each entity comes with the insert-time candidate the client submits when
//! creating it. Candidates omit server-assigned fields (`id`, `isAdmin`,
//! `createdAt`); a payload that carries them anyway still deserializes, the
//! extra fields are simply dropped.

pub mod cart;
pub mod filter;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem, CartLine, NewCart, NewCartItem};
pub use filter::ProductFilter;
pub use order::{NewOrder, NewOrderItem, Order, OrderItem};
pub use product::{LOW_STOCK_THRESHOLD, NewProduct, Product};
pub use user::{LoginCredentials, NewUser, SessionPayload, SessionUser, User};
