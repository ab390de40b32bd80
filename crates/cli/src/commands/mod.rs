//! Command implementations, one module per area of the storefront.

pub mod cart;
pub mod session;
pub mod shop;
