//! Catalog product types.
//!
//! A [`Product`] is embedded whole in every cart line item, so its serialized
//! form is also the persisted cart format. Field names are camelCase to match
//! the backend's row representation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::{CurrencyCode, Price};

/// Storefront department a product is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Men,
    Women,
    Kids,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Men => write!(f, "men"),
            Self::Women => write!(f, "women"),
            Self::Kids => write!(f, "kids"),
        }
    }
}

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in the store currency.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: String,
    pub category: Category,
    pub image_url: String,
    /// Sizes offered for this product (e.g. `S`, `M`, `L`).
    pub sizes: Vec<String>,
    /// Colors offered for this product.
    pub colors: Vec<String>,
    pub in_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

impl Product {
    /// Unit price in the store currency.
    #[must_use]
    pub const fn unit_price(&self, currency_code: CurrencyCode) -> Price {
        Price::new(self.price, currency_code)
    }

    /// Whether `size` is among the listed sizes.
    #[must_use]
    pub fn offers_size(&self, size: &str) -> bool {
        self.sizes.iter().any(|s| s == size)
    }
}
