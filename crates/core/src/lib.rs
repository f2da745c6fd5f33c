//! Stylish Core - Shared types library.
//!
//! This crate provides the domain types used across the Stylish storefront:
//! - `storefront` - Cart, notifications, and realtime status sync
//! - `integration-tests` - Cross-module tests of the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage, no network
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, products, statuses, and addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
