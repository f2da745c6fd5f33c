//! Catalog search and filtering.
//!
//! [`ProductFilter`] holds the shop page's search box, category and size
//! toggles, and price slider. Filtering is done in memory over the product
//! list already loaded for the page.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stylish_core::{Category, Product};

/// Inclusive price bounds in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: Decimal::ZERO,
            max: Decimal::from(200),
        }
    }
}

impl PriceRange {
    #[must_use]
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.min && price <= self.max
    }
}

/// Active filters on the shop page.
///
/// Empty category and size selections do not restrict results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Free text matched against name, description, and category.
    pub query: String,
    pub categories: Vec<Category>,
    pub sizes: Vec<String>,
    pub price: PriceRange,
}

impl ProductFilter {
    /// Whether `product` passes every active filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_query(product)
            && (self.categories.is_empty() || self.categories.contains(&product.category))
            && (self.sizes.is_empty() || self.sizes.iter().any(|s| product.offers_size(s)))
            && self.price.contains(product.price)
    }

    /// Products passing the filter, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }

    /// Select `category` if unselected, otherwise deselect it.
    pub fn toggle_category(&mut self, category: Category) {
        toggle(&mut self.categories, category);
    }

    /// Select `size` if unselected, otherwise deselect it.
    pub fn toggle_size(&mut self, size: impl Into<String>) {
        toggle(&mut self.sizes, size.into());
    }

    fn matches_query(&self, product: &Product) -> bool {
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        product.name.to_lowercase().contains(&query)
            || product.description.to_lowercase().contains(&query)
            || product.category.to_string().contains(&query)
    }
}

fn toggle<T: PartialEq>(selected: &mut Vec<T>, value: T) {
    if let Some(pos) = selected.iter().position(|v| *v == value) {
        selected.remove(pos);
    } else {
        selected.push(value);
    }
}
