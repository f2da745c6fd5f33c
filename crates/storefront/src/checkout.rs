//! Checkout totals and order drafts.
//!
//! Turns the current cart into the figures shown on the checkout page and the
//! order record submitted to the backend. Submission itself, and clearing the
//! cart once the backend accepts the order, happen in the caller.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use stylish_core::{
    AddressError, CurrencyCode, OrderItem, OrderStatus, Price, ShippingAddress, UserId,
};

use crate::cart::CartStore;

/// Sales tax applied at checkout (10%).
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Errors that can occur when preparing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// There is nothing to order.
    #[error("Cart is empty")]
    EmptyCart,

    /// Shipping address failed validation.
    #[error("Invalid shipping address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// Tax rate outside `0..=1`.
    #[error("Invalid tax rate: {0}")]
    InvalidTaxRate(Decimal),
}

/// Subtotal, tax, and total for the current cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub item_count: u64,
    pub subtotal: Price,
    pub tax: Price,
    pub total: Price,
}

impl CheckoutSummary {
    /// Compute totals for `cart`. Tax is rounded to cents.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidTaxRate` if `tax_rate` is negative or
    /// above 1.
    pub fn from_cart(
        cart: &CartStore,
        tax_rate: Decimal,
        currency_code: CurrencyCode,
    ) -> Result<Self, CheckoutError> {
        if tax_rate.is_sign_negative() || tax_rate > Decimal::ONE {
            return Err(CheckoutError::InvalidTaxRate(tax_rate));
        }

        let subtotal = cart.items().iter().fold(Price::zero(currency_code), |subtotal, line| {
            let line_total = line.product.unit_price(currency_code).times(line.quantity);
            Price::new(subtotal.amount + line_total.amount, currency_code)
        });
        let tax = Price::new(subtotal.amount * tax_rate, currency_code).round_to_cents();
        let total = Price::new(subtotal.amount + tax.amount, currency_code);

        Ok(Self {
            item_count: cart.total_items(),
            subtotal,
            tax,
            total,
        })
    }
}

/// An order ready to be inserted by the backend layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    /// Unit prices are captured at checkout.
    pub items: Vec<OrderItem>,
}

impl OrderDraft {
    /// Build a pending order from the cart contents.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the cart is empty, the address is
    /// incomplete, or the tax rate is invalid.
    pub fn from_cart(
        cart: &CartStore,
        user_id: UserId,
        shipping_address: ShippingAddress,
        payment_method: impl Into<String>,
        tax_rate: Decimal,
    ) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        shipping_address.validate()?;
        let summary = CheckoutSummary::from_cart(cart, tax_rate, CurrencyCode::default())?;

        let items = cart
            .items()
            .iter()
            .map(|line| OrderItem {
                product_id: line.product.id,
                quantity: line.quantity,
                size: line.size.clone(),
                color: line.color.clone(),
                price: line.product.price,
            })
            .collect();

        Ok(Self {
            user_id,
            status: OrderStatus::Pending,
            shipping_address,
            payment_method: payment_method.into(),
            total: summary.total.amount,
            items,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use stylish_core::{Category, Product, ProductId};

    use super::*;
    use crate::storage::MemoryStore;

    fn cart_with(lines: &[(i64, u32)]) -> CartStore {
        let mut cart = CartStore::load(Arc::new(MemoryStore::new()));
        for (cents, quantity) in lines {
            let product = Product {
                id: ProductId::generate(),
                name: "Item".to_string(),
                price: Decimal::new(*cents, 2),
                description: String::new(),
                category: Category::Kids,
                image_url: String::new(),
                sizes: Vec::new(),
                colors: Vec::new(),
                in_stock: true,
                featured: None,
            };
            cart.add_to_cart(product, *quantity, "M", "green");
        }
        cart
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Grace Hopper".to_string(),
            street_address: "1 Navy Way".to_string(),
            city: "Arlington".to_string(),
            state: "VA".to_string(),
            postal_code: "22202".to_string(),
            country: "US".to_string(),
        }
    }

    #[test]
    fn test_default_tax_rate_is_ten_percent() {
        assert_eq!(DEFAULT_TAX_RATE, Decimal::new(1, 1));
    }

    #[test]
    fn test_summary_totals() {
        let cart = cart_with(&[(2000, 2), (1999, 1)]);
        let summary =
            CheckoutSummary::from_cart(&cart, DEFAULT_TAX_RATE, CurrencyCode::USD).unwrap();

        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal.amount, cart.total_price());
        assert_eq!(summary.subtotal.amount, Decimal::new(5999, 2));
        assert_eq!(summary.tax.amount, Decimal::new(600, 2));
        assert_eq!(summary.total.amount, Decimal::new(6599, 2));
        assert_eq!(summary.total.display(), "$65.99");
    }

    #[test]
    fn test_summary_rejects_bad_tax_rate() {
        let cart = cart_with(&[(1000, 1)]);
        let err = CheckoutSummary::from_cart(&cart, Decimal::new(-1, 1), CurrencyCode::USD)
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidTaxRate(_)));
        assert!(CheckoutSummary::from_cart(&cart, Decimal::TWO, CurrencyCode::USD).is_err());
    }

    #[test]
    fn test_order_draft_from_cart() {
        let cart = cart_with(&[(2500, 2)]);
        let user = UserId::generate();
        let draft =
            OrderDraft::from_cart(&cart, user, address(), "Credit Card", DEFAULT_TAX_RATE)
                .unwrap();

        assert_eq!(draft.user_id, user);
        assert_eq!(draft.status, OrderStatus::Pending);
        assert_eq!(draft.total, Decimal::new(5500, 2));
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].quantity, 2);
        assert_eq!(draft.items[0].price, Decimal::new(2500, 2));

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["payment_method"], "Credit Card");
        assert_eq!(json["shipping_address"]["postalCode"], "22202");
    }

    #[test]
    fn test_order_draft_rejects_empty_cart() {
        let cart = cart_with(&[]);
        let err =
            OrderDraft::from_cart(&cart, UserId::generate(), address(), "Card", DEFAULT_TAX_RATE)
                .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[test]
    fn test_order_draft_rejects_incomplete_address() {
        let cart = cart_with(&[(1000, 1)]);
        let incomplete = ShippingAddress {
            country: String::new(),
            ..address()
        };
        let err = OrderDraft::from_cart(
            &cart,
            UserId::generate(),
            incomplete,
            "Card",
            DEFAULT_TAX_RATE,
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidAddress(_)));
    }
}
