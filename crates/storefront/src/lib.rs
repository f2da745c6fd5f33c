//! Stylish storefront library.
//!
//! Client-side state for the storefront: the persisted shopping cart, the
//! in-app notification list, catalog and admin order filtering, and the
//! realtime listener that turns backend status changes into notifications.
//! Everything is reachable through [`state::AppState`], which is passed
//! explicitly instead of living in globals.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod notifications;
pub mod orders;
pub mod realtime;
pub mod state;
pub mod storage;
