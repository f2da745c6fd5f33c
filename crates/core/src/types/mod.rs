//! Core types for the Stylish storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;

pub use address::{AddressError, ShippingAddress};
pub use id::*;
pub use order::{Order, OrderCustomer, OrderItem};
pub use price::{CurrencyCode, Price};
pub use product::{Category, Product};
pub use status::*;
