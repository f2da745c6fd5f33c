//! Order records as stored by the backend.
//!
//! Field names are snake_case to match the `orders` and `order_items` rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::address::ShippingAddress;
use super::id::{OrderId, ProductId, UserId};
use super::status::OrderStatus;

/// One purchased product variant, with the unit price paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: String,
    pub color: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Customer details joined onto an order for the admin views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    pub name: String,
    pub email: String,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    /// Missing on rows inserted before the column had a default.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// `None` when the customer row could not be loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<OrderCustomer>,
}

impl Order {
    /// Sum of item quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_row_deserializes() {
        let json = serde_json::json!({
            "id": OrderId::generate().to_string(),
            "user_id": UserId::generate().to_string(),
            "items": [{
                "product_id": ProductId::generate().to_string(),
                "quantity": 2,
                "size": "M",
                "color": "navy",
                "price": 24.5
            }],
            "total": 53.9,
            "status": "processing",
            "shipping_address": {
                "fullName": "Ada Lovelace",
                "streetAddress": "12 St James's Square",
                "city": "London",
                "state": "",
                "postalCode": "SW1Y 4JH",
                "country": "UK"
            },
            "payment_method": "Credit Card",
            "created_at": null
        });

        let order: Order = serde_json::from_value(json).unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.total, Decimal::new(539, 1));
        assert_eq!(order.item_count(), 2);
        assert!(order.created_at.is_none());
        assert!(order.customer.is_none());
    }
}
