//! Shopping cart state.
//!
//! [`CartStore`] is the authoritative in-process cart. It is hydrated once from
//! a [`KeyValueStore`] when constructed and writes the full line-item list
//! back under [`CART_STORAGE_KEY`] after every mutation.
//!
//! # Line identity
//!
//! A line is identified by its [`LineKey`]: product id, size, and color.
//! Adding a product whose key already exists accumulates quantity on the
//! existing line instead of appending a new one.
//!
//! Two command families exist for removal and quantity updates:
//!
//! - [`CartStore::remove_from_cart`] / [`CartStore::update_quantity`] act on
//!   every variant of a product.
//! - [`CartStore::remove_line`] / [`CartStore::update_line_quantity`] act on
//!   exactly one variant.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use stylish_core::{Product, ProductId};

use crate::error::{AppError, add_breadcrumb};
use crate::storage::KeyValueStore;

/// Storage key holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "cart";

/// One product variant and its quantity within the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub product: Product,
    pub quantity: u32,
    pub size: String,
    pub color: String,
}

impl CartLineItem {
    /// Identity of this line within the cart.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product.id, &self.size, &self.color)
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }

    fn matches(&self, key: &LineKey) -> bool {
        self.product.id == key.product_id && self.size == key.size && self.color == key.color
    }
}

/// Uniqueness key of a cart line: (product id, size, color).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
}

impl LineKey {
    #[must_use]
    pub fn new(product_id: ProductId, size: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            product_id,
            size: size.into(),
            color: color.into(),
        }
    }
}

/// Clamp a user-entered quantity to the valid line range.
///
/// The store applies quantities as given; view code runs input through this
/// first, so blank or negative entries become 1.
#[must_use]
pub fn clamp_quantity(value: i64) -> u32 {
    u32::try_from(value.max(1)).unwrap_or(u32::MAX)
}

/// The shopping cart, synchronized to durable local storage.
pub struct CartStore {
    items: Vec<CartLineItem>,
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Hydrate a cart from `storage`.
    ///
    /// Falls back to an empty cart if nothing is stored, the stored value is
    /// malformed, or the storage cannot be read. Startup never fails on cart
    /// state.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let items = match storage.get(CART_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<CartLineItem>>(&raw) {
                Ok(items) => normalize(items),
                Err(e) => {
                    warn!(error = %e, "Persisted cart is malformed, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                AppError::from(e).report();
                Vec::new()
            }
        };

        debug!(lines = items.len(), "Cart hydrated");
        Self { items, storage }
    }

    /// Current line items in display order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `quantity` units of a product variant.
    ///
    /// Accumulates onto an existing line with the same (product, size, color),
    /// otherwise appends a new line. The quantity is not validated.
    pub fn add_to_cart(
        &mut self,
        product: Product,
        quantity: u32,
        size: impl Into<String>,
        color: impl Into<String>,
    ) {
        let key = LineKey::new(product.id, size, color);
        let product_id = product.id.to_string();

        if let Some(line) = self.items.iter_mut().find(|line| line.matches(&key)) {
            line.quantity = line.quantity.saturating_add(quantity);
            debug!(%product_id, quantity = line.quantity, "Cart line quantity increased");
        } else {
            debug!(%product_id, quantity, size = %key.size, color = %key.color, "Cart line added");
            self.items.push(CartLineItem {
                product,
                quantity,
                size: key.size,
                color: key.color,
            });
        }

        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
        self.persist();
    }

    /// Remove every line of `product_id`, whatever its size or color.
    ///
    /// Removing a product that is not in the cart is a no-op.
    pub fn remove_from_cart(&mut self, product_id: ProductId) {
        let before = self.items.len();
        self.items.retain(|line| line.product.id != product_id);
        debug!(%product_id, removed = before - self.items.len(), "Product removed from cart");
        let product_id = product_id.to_string();
        add_breadcrumb("cart", "Removed from cart", Some(&[("product_id", product_id.as_str())]));
        self.persist();
    }

    /// Remove exactly one variant line.
    ///
    /// Returns `true` if a line was removed.
    pub fn remove_line(&mut self, key: &LineKey) -> bool {
        let before = self.items.len();
        self.items.retain(|line| !line.matches(key));
        let removed = self.items.len() != before;
        if removed {
            debug!(
                product_id = %key.product_id,
                size = %key.size,
                color = %key.color,
                "Cart line removed"
            );
            add_line_breadcrumb("Removed cart line", key);
            self.persist();
        }
        removed
    }

    /// Set the quantity of every line of `product_id`.
    ///
    /// No lower bound is enforced here; see [`clamp_quantity`].
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: u32) {
        for line in self.items.iter_mut().filter(|line| line.product.id == product_id) {
            line.quantity = quantity;
        }
        debug!(%product_id, quantity, "Cart quantity updated");
        let product_id = product_id.to_string();
        let quantity = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Updated quantity",
            Some(&[("product_id", product_id.as_str()), ("quantity", quantity.as_str())]),
        );
        self.persist();
    }

    /// Set the quantity of exactly one variant line.
    ///
    /// Returns `true` if the line exists.
    pub fn update_line_quantity(&mut self, key: &LineKey, quantity: u32) -> bool {
        let Some(line) = self.items.iter_mut().find(|line| line.matches(key)) else {
            return false;
        };
        line.quantity = quantity;
        debug!(product_id = %key.product_id, quantity, "Cart line quantity updated");
        add_line_breadcrumb("Updated line quantity", key);
        self.persist();
        true
    }

    /// Empty the cart.
    pub fn clear_cart(&mut self) {
        self.items.clear();
        debug!("Cart cleared");
        add_breadcrumb("cart", "Cleared cart", None);
        self.persist();
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of unit price times quantity over all lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Write the full line list to storage. Failures are reported, not returned.
    fn persist(&self) {
        let result = serde_json::to_string(&self.items)
            .map_err(AppError::from)
            .and_then(|raw| {
                self.storage
                    .set(CART_STORAGE_KEY, &raw)
                    .map_err(AppError::from)
            });

        if let Err(e) = result {
            e.report();
        }
    }
}

fn add_line_breadcrumb(message: &str, key: &LineKey) {
    let product_id = key.product_id.to_string();
    add_breadcrumb(
        "cart",
        message,
        Some(&[
            ("product_id", product_id.as_str()),
            ("size", key.size.as_str()),
            ("color", key.color.as_str()),
        ]),
    );
}

/// Merge lines sharing a key so hydrated state upholds line uniqueness.
fn normalize(items: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut merged: Vec<CartLineItem> = Vec::with_capacity(items.len());
    for item in items {
        let key = item.key();
        if let Some(existing) = merged.iter_mut().find(|line| line.matches(&key)) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            merged.push(item);
        }
    }
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use stylish_core::Category;

    use super::*;
    use crate::storage::{MemoryStore, StorageError};

    fn product(name: &str, cents: i64) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_string(),
            price: Decimal::new(cents, 2),
            description: String::new(),
            category: Category::Women,
            image_url: String::new(),
            sizes: vec!["S".to_string(), "M".to_string()],
            colors: vec!["red".to_string(), "blue".to_string()],
            in_stock: true,
            featured: None,
        }
    }

    fn empty_cart() -> (CartStore, MemoryStore) {
        let storage = MemoryStore::new();
        (CartStore::load(Arc::new(storage.clone())), storage)
    }

    #[test]
    fn test_add_same_variant_accumulates() {
        let (mut cart, _) = empty_cart();
        let dress = product("Dress", 4999);

        cart.add_to_cart(dress.clone(), 2, "M", "red");
        cart.add_to_cart(dress, 3, "M", "red");

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn test_add_different_color_appends() {
        let (mut cart, _) = empty_cart();
        let dress = product("Dress", 4999);

        cart.add_to_cart(dress.clone(), 1, "M", "red");
        cart.add_to_cart(dress, 1, "M", "blue");

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].color, "red");
        assert_eq!(cart.items()[1].color, "blue");
    }

    #[test]
    fn test_existing_line_keeps_position() {
        let (mut cart, _) = empty_cart();
        let dress = product("Dress", 4999);
        let scarf = product("Scarf", 1500);

        cart.add_to_cart(dress.clone(), 1, "S", "red");
        cart.add_to_cart(scarf.clone(), 1, "S", "red");
        cart.add_to_cart(dress.clone(), 1, "S", "red");

        assert_eq!(cart.items()[0].product.id, dress.id);
        assert_eq!(cart.items()[1].product.id, scarf.id);
    }

    #[test]
    fn test_totals() {
        let (mut cart, _) = empty_cart();
        cart.add_to_cart(product("Dress", 4999), 2, "M", "red");
        cart.add_to_cart(product("Scarf", 1550), 3, "S", "blue");

        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_price(), Decimal::new(14_648, 2));
        let expected: Decimal = cart.items().iter().map(CartLineItem::line_total).sum();
        assert_eq!(cart.total_price(), expected);
    }

    #[test]
    fn test_remove_from_cart_removes_every_variant() {
        let (mut cart, _) = empty_cart();
        let dress = product("Dress", 4999);
        let scarf = product("Scarf", 1500);
        cart.add_to_cart(dress.clone(), 1, "M", "red");
        cart.add_to_cart(scarf.clone(), 1, "S", "red");
        cart.add_to_cart(dress.clone(), 1, "S", "blue");

        cart.remove_from_cart(dress.id);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product.id, scarf.id);
    }

    #[test]
    fn test_remove_missing_product_is_noop() {
        let (mut cart, _) = empty_cart();
        cart.add_to_cart(product("Dress", 4999), 1, "M", "red");
        cart.remove_from_cart(ProductId::generate());
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_remove_line_targets_single_variant() {
        let (mut cart, _) = empty_cart();
        let dress = product("Dress", 4999);
        cart.add_to_cart(dress.clone(), 1, "M", "red");
        cart.add_to_cart(dress.clone(), 1, "M", "blue");

        assert!(cart.remove_line(&LineKey::new(dress.id, "M", "red")));
        assert!(!cart.remove_line(&LineKey::new(dress.id, "M", "red")));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].color, "blue");
    }

    #[test]
    fn test_update_quantity_applies_to_all_variants() {
        let (mut cart, _) = empty_cart();
        let dress = product("Dress", 4999);
        cart.add_to_cart(dress.clone(), 1, "M", "red");
        cart.add_to_cart(dress.clone(), 4, "S", "blue");

        cart.update_quantity(dress.id, 2);

        assert!(cart.items().iter().all(|line| line.quantity == 2));
        assert_eq!(cart.total_items(), 4);
    }

    #[test]
    fn test_update_line_quantity() {
        let (mut cart, _) = empty_cart();
        let dress = product("Dress", 4999);
        cart.add_to_cart(dress.clone(), 1, "M", "red");
        cart.add_to_cart(dress.clone(), 1, "M", "blue");

        assert!(cart.update_line_quantity(&LineKey::new(dress.id, "M", "blue"), 7));
        assert!(!cart.update_line_quantity(&LineKey::new(dress.id, "L", "blue"), 7));
        assert_eq!(cart.items()[0].quantity, 1);
        assert_eq!(cart.items()[1].quantity, 7);
    }

    #[test]
    fn test_zero_quantity_is_stored() {
        let (mut cart, storage) = empty_cart();
        let dress = product("Dress", 4999);
        let scarf = product("Scarf", 1500);
        cart.add_to_cart(dress.clone(), 3, "M", "red");
        cart.add_to_cart(scarf.clone(), 2, "S", "blue");

        cart.update_quantity(dress.id, 0);
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].quantity, 0);
        assert_eq!(cart.total_items(), 2);

        assert!(cart.update_line_quantity(&LineKey::new(scarf.id, "S", "blue"), 0));
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_price(), Decimal::ZERO);

        let reloaded = CartStore::load(Arc::new(storage));
        assert_eq!(reloaded.items().len(), 2);
        assert!(reloaded.items().iter().all(|line| line.quantity == 0));
    }

    #[test]
    fn test_commands_leave_breadcrumbs() {
        let events = sentry::test::with_captured_events(|| {
            let (mut cart, _) = empty_cart();
            let dress = product("Dress", 4999);
            let key = LineKey::new(dress.id, "M", "red");

            cart.add_to_cart(dress.clone(), 1, "M", "red");
            cart.update_quantity(dress.id, 2);
            cart.update_line_quantity(&key, 3);
            cart.remove_line(&key);
            cart.add_to_cart(dress.clone(), 1, "S", "blue");
            cart.remove_from_cart(dress.id);
            cart.clear_cart();

            sentry::capture_message("checkout failed", sentry::Level::Error);
        });

        assert_eq!(events.len(), 1);
        let trail: Vec<&str> = events[0]
            .breadcrumbs
            .values
            .iter()
            .filter(|crumb| crumb.category.as_deref() == Some("cart"))
            .filter_map(|crumb| crumb.message.as_deref())
            .collect();
        assert_eq!(
            trail,
            vec![
                "Added to cart",
                "Updated quantity",
                "Updated line quantity",
                "Removed cart line",
                "Added to cart",
                "Removed from cart",
                "Cleared cart",
            ]
        );
    }

    #[test]
    fn test_clear_cart_zeroes_totals() {
        let (mut cart, _) = empty_cart();
        cart.add_to_cart(product("Dress", 4999), 2, "M", "red");
        cart.clear_cart();

        assert!(cart.is_empty());
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn test_clamp_quantity() {
        assert_eq!(clamp_quantity(-3), 1);
        assert_eq!(clamp_quantity(0), 1);
        assert_eq!(clamp_quantity(12), 12);
        assert_eq!(clamp_quantity(i64::MAX), u32::MAX);
    }

    #[test]
    fn test_every_mutation_persists() {
        let (mut cart, storage) = empty_cart();
        let dress = product("Dress", 4999);

        cart.add_to_cart(dress.clone(), 1, "M", "red");
        let stored = storage.get(CART_STORAGE_KEY).unwrap().unwrap();
        let lines: Vec<CartLineItem> = serde_json::from_str(&stored).unwrap();
        assert_eq!(lines.len(), 1);

        cart.clear_cart();
        assert_eq!(storage.get(CART_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_reload_reproduces_items() {
        let (mut cart, storage) = empty_cart();
        cart.add_to_cart(product("Dress", 4999), 2, "M", "red");
        cart.add_to_cart(product("Scarf", 1500), 1, "S", "blue");

        let reloaded = CartStore::load(Arc::new(storage));
        assert_eq!(reloaded.items(), cart.items());
    }

    #[test]
    fn test_persisted_layout_field_names() {
        let (mut cart, storage) = empty_cart();
        cart.add_to_cart(product("Dress", 4999), 2, "M", "red");

        let stored = storage.get(CART_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
        let line = &value[0];
        assert!(line["product"]["imageUrl"].is_string());
        assert_eq!(line["quantity"], 2);
        assert_eq!(line["size"], "M");
        assert_eq!(line["color"], "red");
    }

    #[test]
    fn test_malformed_storage_falls_back_to_empty() {
        let storage = MemoryStore::new();
        storage.set(CART_STORAGE_KEY, "{not json").unwrap();
        let cart = CartStore::load(Arc::new(storage));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_duplicate_persisted_lines_are_merged() {
        let (mut cart, storage) = empty_cart();
        let dress = product("Dress", 4999);
        cart.add_to_cart(dress, 2, "M", "red");
        let line = cart.items()[0].clone();
        let duplicated = serde_json::to_string(&vec![line.clone(), line]).unwrap();
        storage.set(CART_STORAGE_KEY, &duplicated).unwrap();

        let reloaded = CartStore::load(Arc::new(storage));
        assert_eq!(reloaded.items().len(), 1);
        assert_eq!(reloaded.items()[0].quantity, 4);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::InvalidKey(key.to_string()))
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::InvalidKey(key.to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_storage_failures_are_absorbed() {
        let mut cart = CartStore::load(Arc::new(FailingStore));
        assert!(cart.is_empty());

        cart.add_to_cart(product("Dress", 4999), 1, "M", "red");
        assert_eq!(cart.total_items(), 1);
    }
}
