//! Unified error handling with Sentry integration.
//!
//! Nothing in the storefront core surfaces an error to the shopper: failures
//! are absorbed where they happen. `AppError` collects every failure kind so
//! that absorbed errors can still be captured to Sentry and logged through
//! [`AppError::report`].

use thiserror::Error;

use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::realtime::RealtimeError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Persisted state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Realtime subscription or payload failure.
    #[error("Realtime error: {0}")]
    Realtime(#[from] RealtimeError),

    /// Checkout could not be prepared.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Configuration is missing or invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// State could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Whether the error stems from the environment rather than caller input.
    ///
    /// Only these are worth an error-tracker event; checkout rejections are
    /// expected user-facing outcomes.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Realtime(_) | Self::Serialization(_)
        )
    }

    /// Capture an absorbed error to Sentry and log it.
    pub fn report(&self) {
        if self.is_operational() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Absorbed error"
            );
        } else {
            tracing::warn!(error = %self, "Absorbed error");
        }
    }
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// commands leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "8f1c...")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Storage(StorageError::InvalidKey("../x".to_string()));
        assert_eq!(err.to_string(), "Storage error: Invalid storage key: ../x");

        let err = AppError::Checkout(CheckoutError::EmptyCart);
        assert_eq!(err.to_string(), "Checkout error: Cart is empty");
    }

    #[test]
    fn test_operational_classification() {
        let feed_down = RealtimeError::FeedUnavailable("down".to_string());
        assert!(AppError::Realtime(feed_down).is_operational());
        assert!(!AppError::Checkout(CheckoutError::EmptyCart).is_operational());
        let invalid = ConfigError::InvalidEnvVar("X".to_string(), "bad".to_string());
        assert!(!AppError::Config(invalid).is_operational());
    }

    #[test]
    fn test_report_without_sentry_client_is_harmless() {
        AppError::Storage(StorageError::InvalidKey(String::new())).report();
        AppError::Checkout(CheckoutError::EmptyCart).report();
    }
}
