//! Subscription lifecycle and reconnect loop.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use super::event::{ChangeEvent, StatusChange, detect_status_change};
use super::feed::ChangeFeed;
use super::{ChannelSpec, Entity};

/// Receives status transitions detected on the change feeds.
///
/// Called from listener tasks; implementations must not block for long.
pub trait StatusChangeHandler: Send + Sync + 'static {
    fn on_status_change(&self, change: &StatusChange);
}

impl<F> StatusChangeHandler for F
where
    F: Fn(&StatusChange) + Send + Sync + 'static,
{
    fn on_status_change(&self, change: &StatusChange) {
        self(change);
    }
}

/// Connection state of one entity subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Receiving events.
    Subscribed,
    /// Feed dropped or refused; waiting to retry.
    Reconnecting,
    /// Not connected: before the first subscribe, or after stop.
    Unsubscribed,
}

/// Exponential reconnect delay.
///
/// The delay for attempt `n` (zero-based) is `initial * 2^n`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

/// Keeps the product and order subscriptions alive and dispatches status
/// changes.
#[derive(Debug)]
pub struct RealtimeListener<F> {
    feed: Arc<F>,
    backoff: BackoffPolicy,
}

impl<F: ChangeFeed> RealtimeListener<F> {
    #[must_use]
    pub const fn new(feed: Arc<F>, backoff: BackoffPolicy) -> Self {
        Self { feed, backoff }
    }

    /// Subscribe to every watched entity, forwarding status changes to
    /// `handler`.
    ///
    /// Spawns one task per entity; must be called within a tokio runtime.
    /// Dropping the returned handle without calling [`stop`](Self::stop)
    /// also ends the subscriptions, without waiting for the tasks.
    pub fn start<H: StatusChangeHandler>(&self, handler: H) -> SubscriptionHandle {
        let handler = Arc::new(handler);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let subscriptions = Entity::ALL
            .into_iter()
            .map(|entity| {
                let (state_tx, state_rx) = watch::channel(SubscriptionState::Unsubscribed);
                let task = tokio::spawn(
                    run_subscription(
                        Arc::clone(&self.feed),
                        entity,
                        Arc::clone(&handler),
                        self.backoff,
                        state_tx,
                        shutdown_rx.clone(),
                    )
                    .instrument(info_span!("realtime", channel = entity.channel())),
                );
                Subscription {
                    entity,
                    state: state_rx,
                    task,
                }
            })
            .collect();

        info!("Realtime listener started");
        SubscriptionHandle {
            shutdown: shutdown_tx,
            subscriptions,
        }
    }

    /// Tear down the subscriptions behind `handle`.
    pub async fn stop(&self, handle: SubscriptionHandle) {
        handle.stop().await;
    }
}

struct Subscription {
    entity: Entity,
    state: watch::Receiver<SubscriptionState>,
    task: JoinHandle<()>,
}

/// Owner of a running set of subscriptions.
pub struct SubscriptionHandle {
    shutdown: watch::Sender<bool>,
    subscriptions: Vec<Subscription>,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let states: Vec<_> = self
            .subscriptions
            .iter()
            .map(|s| (s.entity, *s.state.borrow()))
            .collect();
        f.debug_struct("SubscriptionHandle")
            .field("states", &states)
            .finish_non_exhaustive()
    }
}

impl SubscriptionHandle {
    /// Current state of the subscription for `entity`.
    #[must_use]
    pub fn state(&self, entity: Entity) -> SubscriptionState {
        self.subscriptions
            .iter()
            .find(|s| s.entity == entity)
            .map_or(SubscriptionState::Unsubscribed, |s| *s.state.borrow())
    }

    /// Watch state changes of the subscription for `entity`.
    #[must_use]
    pub fn watch_state(&self, entity: Entity) -> Option<watch::Receiver<SubscriptionState>> {
        self.subscriptions
            .iter()
            .find(|s| s.entity == entity)
            .map(|s| s.state.clone())
    }

    /// Whether any subscription is currently reconnecting.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.subscriptions
            .iter()
            .any(|s| *s.state.borrow() == SubscriptionState::Reconnecting)
    }

    /// Wait until every subscription is receiving events.
    ///
    /// Returns early if a subscription task has ended.
    pub async fn subscribed(&self) {
        for subscription in &self.subscriptions {
            let mut state = subscription.state.clone();
            if state
                .wait_for(|s| *s == SubscriptionState::Subscribed)
                .await
                .is_err()
            {
                return;
            }
        }
    }

    /// Signal every subscription to stop and wait for the tasks to finish.
    pub async fn stop(self) {
        self.shutdown.send_replace(true);
        for subscription in self.subscriptions {
            if let Err(e) = subscription.task.await {
                warn!(entity = %subscription.entity, error = %e, "Subscription task failed");
            }
        }
        info!("Realtime listener stopped");
    }
}

/// Subscribe, drain, and resubscribe with backoff until shutdown.
async fn run_subscription<F, H>(
    feed: Arc<F>,
    entity: Entity,
    handler: Arc<H>,
    backoff: BackoffPolicy,
    state: watch::Sender<SubscriptionState>,
    mut shutdown: watch::Receiver<bool>,
) where
    F: ChangeFeed,
    H: StatusChangeHandler,
{
    let channel = ChannelSpec::updates(entity);
    let mut attempt: u32 = 0;

    'session: loop {
        let subscribed = tokio::select! {
            biased;
            _ = shutdown.changed() => break 'session,
            result = feed.subscribe(&channel) => result,
        };

        match subscribed {
            Ok(mut stream) => {
                attempt = 0;
                state.send_replace(SubscriptionState::Subscribed);
                info!("Subscribed");

                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => {
                            // Events the feed already accepted still count
                            let mut drained = 0_usize;
                            while let Ok(payload) = stream.try_recv() {
                                dispatch(entity, &payload, handler.as_ref());
                                drained += 1;
                            }
                            debug!(drained, "Drained pending events before stop");
                            break 'session;
                        }
                        payload = stream.recv() => match payload {
                            Some(payload) => dispatch(entity, &payload, handler.as_ref()),
                            None => {
                                warn!("Change feed closed");
                                break;
                            }
                        },
                    }
                }
            }
            Err(e) => warn!(error = %e, attempt, "Subscribe failed"),
        }

        state.send_replace(SubscriptionState::Reconnecting);
        let delay = backoff.delay(attempt);
        attempt = attempt.saturating_add(1);
        debug!(delay_ms = delay.as_millis(), attempt, "Reconnecting after delay");

        tokio::select! {
            biased;
            _ = shutdown.changed() => break 'session,
            () = tokio::time::sleep(delay) => {}
        }
    }

    state.send_replace(SubscriptionState::Unsubscribed);
    debug!("Unsubscribed");
}

/// Parse one payload and forward a detected status change.
///
/// Malformed payloads are logged and dropped.
fn dispatch<H: StatusChangeHandler>(entity: Entity, payload: &Value, handler: &H) {
    match ChangeEvent::from_value(payload).and_then(|event| detect_status_change(entity, &event)) {
        Ok(Some(change)) => {
            debug!(label = %change.label, new_status = %change.new_status, "Status changed");
            handler.on_status_change(&change);
        }
        Ok(None) => trace!("No status change"),
        Err(e) => warn!(error = %e, "Dropping change event"),
    }
}
