//! User-facing notifications.
//!
//! [`NotificationStore`] keeps the most recent notifications in a bounded ring
//! buffer: once full, adding a notification evicts the oldest one.
//! [`SharedNotifications`] wraps a store for use from realtime listener tasks
//! and publishes a revision counter so the view layer can re-render on change.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use stylish_core::NotificationId;

use crate::realtime::{StatusChange, StatusChangeHandler};

/// Default number of notifications retained.
pub const DEFAULT_NOTIFICATION_CAPACITY: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

/// A transient message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Bounded, insertion-ordered list of notifications.
#[derive(Debug, Clone)]
pub struct NotificationStore {
    entries: VecDeque<Notification>,
    capacity: NonZeroUsize,
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NOTIFICATION_CAPACITY)
    }
}

impl NotificationStore {
    /// Create an empty store retaining at most `capacity` notifications.
    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.get()),
            capacity,
        }
    }

    /// Append an unread notification and return its id.
    pub fn add_notification(&mut self, message: impl Into<String>) -> NotificationId {
        if self.entries.len() >= self.capacity.get()
            && let Some(evicted) = self.entries.pop_front()
        {
            debug!(id = %evicted.id, read = evicted.read, "Notification evicted");
        }

        let notification = Notification {
            id: NotificationId::generate(),
            message: message.into(),
            read: false,
            created_at: Utc::now(),
        };
        let id = notification.id;
        self.entries.push_back(notification);
        id
    }

    /// Mark the notification with `id` as read.
    ///
    /// Returns `false` if no such notification is retained. Marking an
    /// already-read notification has no further effect.
    pub fn mark_as_read(&mut self, id: NotificationId) -> bool {
        match self.entries.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    /// Mark every notification as read, returning how many changed.
    pub fn mark_all_as_read(&mut self) -> usize {
        let mut changed = 0;
        for notification in self.entries.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            changed += 1;
        }
        changed
    }

    /// Number of notifications not yet read.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    #[must_use]
    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    /// Notifications oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }
}

/// Cloneable handle to a notification store shared with listener tasks.
///
/// Every mutation bumps a revision published on a `watch` channel.
#[derive(Debug, Clone)]
pub struct SharedNotifications {
    store: Arc<Mutex<NotificationStore>>,
    revision: Arc<watch::Sender<u64>>,
}

impl SharedNotifications {
    #[must_use]
    pub fn new(store: NotificationStore) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            store: Arc::new(Mutex::new(store)),
            revision: Arc::new(revision),
        }
    }

    /// Lock the underlying store.
    ///
    /// Mutations made through the guard do not bump the revision; prefer the
    /// methods on this handle.
    pub fn lock(&self) -> MutexGuard<'_, NotificationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receive the revision counter, bumped after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn add_notification(&self, message: impl Into<String>) -> NotificationId {
        let id = self.lock().add_notification(message);
        self.bump();
        id
    }

    pub fn mark_as_read(&self, id: NotificationId) -> bool {
        let found = self.lock().mark_as_read(id);
        if found {
            self.bump();
        }
        found
    }

    pub fn mark_all_as_read(&self) -> usize {
        let changed = self.lock().mark_all_as_read();
        if changed > 0 {
            self.bump();
        }
        changed
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.lock().unread_count()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

impl Default for SharedNotifications {
    fn default() -> Self {
        Self::new(NotificationStore::default())
    }
}

impl StatusChangeHandler for SharedNotifications {
    fn on_status_change(&self, change: &StatusChange) {
        let message = change.message();
        let id = self.add_notification(message.clone());
        info!(%id, entity = %change.entity, %message, "Status notification added");
    }
}
