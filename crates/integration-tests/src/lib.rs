//! Integration tests for the Stylish storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p stylish-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_persistence` - Cart hydration and persistence through `AppState`
//! - `realtime_notifications` - Change events flowing into notifications
//!
//! Shared fixtures live in this crate so each test file stays focused on
//! behavior.

use rust_decimal::Decimal;
use serde_json::{Value, json};
use stylish_core::{Category, Product, ProductId};

/// A product offered in S/M/L and black/white.
#[must_use]
pub fn sample_product(name: &str, cents: i64) -> Product {
    Product {
        id: ProductId::generate(),
        name: name.to_string(),
        price: Decimal::new(cents, 2),
        description: format!("{name} description"),
        category: Category::Men,
        image_url: format!("https://cdn.example.com/{}.jpg", name.to_lowercase()),
        sizes: vec!["S".to_string(), "M".to_string(), "L".to_string()],
        colors: vec!["black".to_string(), "white".to_string()],
        in_stock: true,
        featured: None,
    }
}

/// An `UPDATE` change event on `table` with the given old and new records.
#[must_use]
pub fn update_event(table: &str, old: Value, new: Value) -> Value {
    json!({
        "eventType": "UPDATE",
        "schema": "public",
        "table": table,
        "commit_timestamp": "2026-01-15T10:00:00Z",
        "old": old,
        "new": new,
    })
}
