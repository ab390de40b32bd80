//! ShopEase Core - Entity model and validation rules.
//!
//! This crate provides the types shared by every ShopEase component:
//! - `storefront` - Client library (gateway, cart engine, session gate)
//! - `cli` - Command-line driver over the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no caching. Everything here is constructible and checkable
//! without a network.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, quantities, emails, and statuses
//! - [`models`] - Products, carts, orders, users, and their insert-time candidates
//! - [`validation`] - Validation errors and the [`Validate`] trait

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::{Validate, ValidationError};
