//! Shipping address type.

use serde::{Deserialize, Serialize};

/// Errors that can occur when validating a [`ShippingAddress`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is blank.
    #[error("{0} cannot be empty")]
    MissingField(&'static str),
}

/// Destination for an order, as collected at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Check that every field has a non-blank value.
    ///
    /// # Errors
    ///
    /// Returns the first blank field as [`AddressError::MissingField`].
    pub fn validate(&self) -> Result<(), AddressError> {
        let fields = [
            ("full name", &self.full_name),
            ("street address", &self.street_address),
            ("city", &self.city),
            ("state", &self.state),
            ("postal code", &self.postal_code),
            ("country", &self.country),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(AddressError::MissingField(name));
            }
        }
        Ok(())
    }
}
