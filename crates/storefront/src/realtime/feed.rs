//! Change-feed sources.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{ChannelSpec, RealtimeError};

/// Raw event payloads for one subscription.
///
/// The stream ending (`recv()` returning `None`) means the subscription was
/// dropped by the feed.
pub type ChangeStream = mpsc::UnboundedReceiver<Value>;

/// A source of row-level change events.
///
/// Payloads are delivered unparsed so the listener decides what counts as
/// malformed.
pub trait ChangeFeed: Send + Sync + 'static {
    /// Open a subscription for `channel`.
    fn subscribe(
        &self,
        channel: &ChannelSpec,
    ) -> impl Future<Output = Result<ChangeStream, RealtimeError>> + Send;
}

/// In-process change feed.
///
/// Events are published per table and fanned out to every live subscription
/// on that table. Clones share subscribers.
#[derive(Debug, Clone, Default)]
pub struct LocalChangeFeed {
    inner: Arc<Mutex<LocalFeedState>>,
}

#[derive(Debug)]
struct LocalFeedState {
    subscribers: Vec<(ChannelSpec, mpsc::UnboundedSender<Value>)>,
    available: bool,
}

impl Default for LocalFeedState {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            available: true,
        }
    }
}

impl LocalChangeFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LocalFeedState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver `payload` to every subscription watching `table`.
    ///
    /// Returns the number of subscriptions that received it.
    pub fn publish(&self, table: &str, payload: &Value) -> usize {
        let mut state = self.state();
        state.subscribers.retain(|(_, tx)| !tx.is_closed());

        let mut delivered = 0;
        for (spec, tx) in &state.subscribers {
            if wants(spec, table, payload) && tx.send(payload.clone()).is_ok() {
                delivered += 1;
            }
        }
        trace!(table, delivered, "Change event published");
        delivered
    }

    /// Drop every open subscription, as a lost connection would.
    pub fn disconnect_all(&self) {
        let mut state = self.state();
        debug!(count = state.subscribers.len(), "Disconnecting all subscriptions");
        state.subscribers.clear();
    }

    /// Make new subscriptions succeed (`true`) or fail (`false`).
    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state();
        state.subscribers.retain(|(_, tx)| !tx.is_closed());
        state.subscribers.len()
    }
}

/// Table must match; the event-kind filter only applies when the payload
/// names its kind, so malformed payloads still reach the listener.
fn wants(spec: &ChannelSpec, table: &str, payload: &Value) -> bool {
    if spec.table != table {
        return false;
    }
    match (spec.event, payload.get("eventType").and_then(Value::as_str)) {
        (Some(kind), Some(event_type)) => kind.as_str() == event_type,
        _ => true,
    }
}

impl ChangeFeed for LocalChangeFeed {
    async fn subscribe(&self, channel: &ChannelSpec) -> Result<ChangeStream, RealtimeError> {
        let mut state = self.state();
        if !state.available {
            return Err(RealtimeError::FeedUnavailable(format!(
                "channel '{}' refused",
                channel.name
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.subscribers.push((channel.clone(), tx));
        debug!(channel = channel.name, table = channel.table, "Local subscription opened");
        Ok(rx)
    }
}
