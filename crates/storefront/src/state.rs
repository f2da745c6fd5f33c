//! Application state shared across tasks.

use std::sync::Arc;

use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::notifications::{NotificationStore, SharedNotifications};
use crate::realtime::{BackoffPolicy, ChangeFeed, RealtimeListener, SubscriptionHandle};
use crate::storage::{FileStore, KeyValueStore, StorageError};

/// Application state shared across all tasks.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration, the persistence backend, and the notification store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    storage: Arc<dyn KeyValueStore>,
    notifications: SharedNotifications,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("notifications", &self.inner.notifications)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create a new application state persisting to `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn new(config: StorefrontConfig) -> Result<Self, StorageError> {
        let storage = FileStore::open(&config.data_dir)?;
        Ok(Self::with_storage(config, Arc::new(storage)))
    }

    /// Create a new application state over an explicit storage backend.
    #[must_use]
    pub fn with_storage(config: StorefrontConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        let store = NotificationStore::with_capacity(config.notification_capacity);
        let notifications = SharedNotifications::new(store);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                storage,
                notifications,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the persistence backend.
    #[must_use]
    pub fn storage(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.inner.storage)
    }

    /// Get the shared notification store.
    #[must_use]
    pub fn notifications(&self) -> &SharedNotifications {
        &self.inner.notifications
    }

    /// Hydrate the cart from storage.
    #[must_use]
    pub fn load_cart(&self) -> CartStore {
        CartStore::load(self.storage())
    }

    /// Build a listener over `feed` using the configured backoff.
    #[must_use]
    pub fn realtime_listener<F: ChangeFeed>(&self, feed: Arc<F>) -> RealtimeListener<F> {
        RealtimeListener::new(feed, BackoffPolicy::from(&self.inner.config.realtime))
    }

    /// Start listening on `feed`, feeding status changes into the
    /// notification store.
    ///
    /// Must be called within a tokio runtime.
    pub fn start_realtime<F: ChangeFeed>(&self, feed: Arc<F>) -> SubscriptionHandle {
        self.realtime_listener(feed).start(self.notifications().clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroUsize;

    use rust_decimal::Decimal;
    use serde_json::json;
    use stylish_core::{Category, Product, ProductId};

    use super::*;
    use crate::realtime::LocalChangeFeed;
    use crate::storage::MemoryStore;

    fn product() -> Product {
        Product {
            id: ProductId::generate(),
            name: "Canvas Tote".to_string(),
            price: Decimal::new(1800, 2),
            description: String::new(),
            category: Category::Women,
            image_url: String::new(),
            sizes: vec!["One Size".to_string()],
            colors: vec!["natural".to_string()],
            in_stock: true,
            featured: Some(true),
        }
    }

    fn memory_state(config: StorefrontConfig) -> AppState {
        AppState::with_storage(config, Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_new_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("state");
        let config = StorefrontConfig {
            data_dir: data_dir.clone(),
            ..StorefrontConfig::default()
        };

        let state = AppState::new(config).unwrap();
        assert!(data_dir.is_dir());
        assert!(state.load_cart().is_empty());
    }

    #[test]
    fn test_cart_shares_storage() {
        let state = memory_state(StorefrontConfig::default());

        let mut cart = state.load_cart();
        cart.add_to_cart(product(), 3, "One Size", "natural");

        let reloaded = state.load_cart();
        assert_eq!(reloaded.total_items(), 3);
        assert_eq!(reloaded.total_price(), Decimal::new(5400, 2));
    }

    #[test]
    fn test_notification_capacity_from_config() {
        let config = StorefrontConfig {
            notification_capacity: NonZeroUsize::new(2).unwrap(),
            ..StorefrontConfig::default()
        };
        let state = memory_state(config);

        for n in 0..5 {
            state.notifications().add_notification(format!("n{n}"));
        }
        assert_eq!(state.notifications().lock().len(), 2);
    }

    #[tokio::test]
    async fn test_start_realtime_feeds_notifications() {
        let state = memory_state(StorefrontConfig::default());
        let feed = Arc::new(LocalChangeFeed::new());
        let mut revisions = state.notifications().subscribe();

        let handle = state.start_realtime(Arc::clone(&feed));
        handle.subscribed().await;

        feed.publish(
            "orders",
            &json!({
                "eventType": "UPDATE",
                "schema": "public",
                "table": "orders",
                "old": {"id": "o-7", "status": "processing"},
                "new": {"id": "o-7", "status": "delivered"},
            }),
        );

        revisions.changed().await.unwrap();
        assert_eq!(state.notifications().unread_count(), 1);
        let message = state
            .notifications()
            .lock()
            .iter()
            .map(|n| n.message.clone())
            .next()
            .unwrap();
        assert_eq!(message, "Order #o-7 status changed to delivered");

        handle.stop().await;
    }
}
