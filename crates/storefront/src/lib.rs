//! ShopEase storefront client library.
//!
//! Talks to the store API and keeps the client's view of it consistent:
//!
//! - [`gateway`] - Request/response access to the store (HTTP in production)
//! - [`queries`] - Cached, invalidatable reads of session, cart and products
//! - [`session`] / [`gate`] - Session resolution and route gating
//! - [`cart`] - The cart consistency engine
//! - [`catalog`] / [`checkout`] - Product reads, admin edits, ordering
//! - [`notice`] - One user-facing outcome per action
//!
//! [`Storefront`] bundles them behind one cloneable handle.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod notice;
pub mod queries;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use cart::{CartEngine, CartError};
pub use config::StorefrontConfig;
pub use error::{AppError, Result};
pub use gate::{GateDecision, Gated, RedirectTarget, RouteClass};
pub use notice::{Notice, NoticeVariant};
pub use session::{SessionState, SessionStore};
pub use state::Storefront;
