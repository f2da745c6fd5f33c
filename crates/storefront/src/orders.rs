//! Admin order list filtering and sorting.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use stylish_core::{Order, OrderStatus};

/// Search box and status dropdown of the order list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilter {
    /// Matched case-insensitively against the order id and customer name.
    pub query: String,
    /// `None` shows every status.
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        if self.status.is_some_and(|status| status != order.status) {
            return false;
        }

        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        order.id.to_string().to_lowercase().contains(&query)
            || order
                .customer
                .as_ref()
                .is_some_and(|customer| customer.name.to_lowercase().contains(&query))
    }
}

/// Column the order list is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSortField {
    #[default]
    Date,
    Total,
}

impl OrderSortField {
    /// Parse a sort field from a URL parameter string.
    #[must_use]
    pub fn from_str_param(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "date" | "created_at" => Some(Self::Date),
            "total" => Some(Self::Total),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Sort state of the order list. Defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSort {
    pub field: OrderSortField,
    pub direction: SortDirection,
}

impl OrderSort {
    /// Column header click: flip the direction on the active column,
    /// otherwise switch to `field` in descending order.
    pub fn toggle(&mut self, field: OrderSortField) {
        if self.field == field {
            self.direction = self.direction.reverse();
        } else {
            self.field = field;
            self.direction = SortDirection::Desc;
        }
    }

    /// Compare two orders. Orders without a creation date sort last in
    /// either direction.
    #[must_use]
    pub fn compare(&self, a: &Order, b: &Order) -> Ordering {
        match self.field {
            OrderSortField::Date => match (a.created_at, b.created_at) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => self.direction.apply(a.cmp(&b)),
            },
            OrderSortField::Total => self.direction.apply(a.total.cmp(&b.total)),
        }
    }
}

/// Orders passing `filter`, sorted by `sort`. Ties keep their input order.
#[must_use]
pub fn filter_and_sort<'a>(
    orders: &'a [Order],
    filter: &OrderFilter,
    sort: OrderSort,
) -> Vec<&'a Order> {
    let mut visible: Vec<&Order> = orders.iter().filter(|o| filter.matches(o)).collect();
    visible.sort_by(|a, b| sort.compare(a, b));
    visible
}
