//! Realtime change-feed listener.
//!
//! # Architecture
//!
//! - The hosted backend pushes row-level change events per channel
//! - [`ChangeFeed`] is the seam to that backend; [`LocalChangeFeed`] is an
//!   in-process hub used for loopback delivery and tests
//! - [`RealtimeListener`] keeps one subscription per watched [`Entity`],
//!   reconnecting with exponential backoff when a feed drops
//! - Status transitions are handed to a [`StatusChangeHandler`], normally
//!   [`SharedNotifications`](crate::notifications::SharedNotifications)
//!
//! # Example
//!
//! ```rust,ignore
//! let feed = Arc::new(LocalChangeFeed::new());
//! let listener = RealtimeListener::new(feed.clone(), BackoffPolicy::default());
//! let handle = listener.start(notifications.clone());
//! handle.subscribed().await;
//!
//! // ... later
//! listener.stop(handle).await;
//! ```

mod event;
mod feed;
mod listener;

pub use event::{ChangeEvent, ChangeKind, StatusChange, detect_status_change};
pub use feed::{ChangeFeed, ChangeStream, LocalChangeFeed};
pub use listener::{
    BackoffPolicy, RealtimeListener, StatusChangeHandler, SubscriptionHandle, SubscriptionState,
};

use thiserror::Error;

/// Errors that can occur when consuming a change feed.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// The feed refused or could not establish a subscription.
    #[error("Change feed unavailable: {0}")]
    FeedUnavailable(String),

    /// Event payload is not valid change-event JSON.
    #[error("Malformed change event: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Event payload lacks a field the listener needs.
    #[error("Change event on '{table}' is missing '{field}'")]
    MissingField { table: String, field: &'static str },

    /// Event arrived for a table the subscription does not watch.
    #[error("Change event for unexpected table '{actual}' (expected '{expected}')")]
    UnexpectedTable {
        expected: &'static str,
        actual: String,
    },
}

/// Watched backend tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Products,
    Orders,
}

impl Entity {
    /// Every entity the storefront watches.
    pub const ALL: [Self; 2] = [Self::Products, Self::Orders];

    /// Backend table name.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Orders => "orders",
        }
    }

    /// Named realtime channel for this entity.
    #[must_use]
    pub const fn channel(&self) -> &'static str {
        match self {
            Self::Products => "products_channel",
            Self::Orders => "orders_channel",
        }
    }

    /// Field of the new record used to label the entity in messages.
    #[must_use]
    pub const fn label_field(&self) -> &'static str {
        match self {
            Self::Products => "name",
            Self::Orders => "id",
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Subscription request sent to a [`ChangeFeed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Channel name (e.g. `orders_channel`).
    pub name: &'static str,
    /// Database schema.
    pub schema: &'static str,
    /// Table to watch.
    pub table: &'static str,
    /// Event kind to deliver; `None` for all kinds.
    pub event: Option<ChangeKind>,
}

impl ChannelSpec {
    /// Update events on the entity's table in the `public` schema.
    #[must_use]
    pub const fn updates(entity: Entity) -> Self {
        Self {
            name: entity.channel(),
            schema: "public",
            table: entity.table(),
            event: Some(ChangeKind::Update),
        }
    }
}
