//! Stylish storefront - client-side state and realtime status sync.
//!
//! Hydrates the persisted cart, starts the realtime listener, and relays
//! change events read as JSON lines on stdin into the local change feed.
//!
//! # Architecture
//!
//! - Cart state persisted as JSON under `STOREFRONT_DATA_DIR`
//! - Realtime listener on the `products` and `orders` tables
//! - Status transitions land in the notification store
//!
//! # Usage
//!
//! ```text
//! echo '{"eventType":"UPDATE","schema":"public","table":"orders",
//!        "old":{"id":"o-1","status":"pending"},
//!        "new":{"id":"o-1","status":"shipped"}}' | stylish-storefront
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use serde_json::Value;
use sentry::integrations::tracing as sentry_tracing;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stylish_core::CurrencyCode;
use stylish_storefront::checkout::CheckoutSummary;
use stylish_storefront::config::StorefrontConfig;
use stylish_storefront::realtime::LocalChangeFeed;
use stylish_storefront::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stylish_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let state = AppState::new(config).expect("Failed to initialize application state");

    let cart = state.load_cart();
    match CheckoutSummary::from_cart(&cart, state.config().tax_rate, CurrencyCode::default()) {
        Ok(summary) => tracing::info!(
            items = summary.item_count,
            subtotal = %summary.subtotal.display(),
            total = %summary.total.display(),
            "Cart hydrated"
        ),
        Err(e) => tracing::warn!(error = %e, "Could not summarize cart"),
    }

    let feed = Arc::new(LocalChangeFeed::new());
    let handle = state.start_realtime(Arc::clone(&feed));
    handle.subscribed().await;

    // Log notification activity in background
    let notifications = state.notifications().clone();
    let mut revisions = notifications.subscribe();
    tokio::spawn(async move {
        while revisions.changed().await.is_ok() {
            tracing::info!(unread = notifications.unread_count(), "Notifications updated");
        }
    });

    tokio::select! {
        () = relay_stdin(&feed) => tracing::info!("Input closed"),
        () = shutdown_signal() => {},
    }

    handle.stop().await;
    tracing::info!(
        unread = state.notifications().unread_count(),
        "Storefront stopped"
    );
}

/// Publish each JSON line from stdin to the change feed under its `table`.
async fn relay_stdin(feed: &LocalChangeFeed) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = match serde_json::from_str(&line) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed input line");
                continue;
            }
        };
        let Some(table) = payload.get("table").and_then(Value::as_str) else {
            tracing::warn!("Skipping input line without a table");
            continue;
        };

        let delivered = feed.publish(table, &payload);
        tracing::debug!(table, delivered, "Relayed change event");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
