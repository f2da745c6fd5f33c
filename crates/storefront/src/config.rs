//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `STOREFRONT_DATA_DIR` - Directory for persisted client state (default: ./data)
//! - `STOREFRONT_NOTIFICATION_CAPACITY` - Notifications retained (default: 100)
//! - `STOREFRONT_TAX_RATE` - Checkout tax rate as a fraction (default: 0.10)
//! - `REALTIME_BACKOFF_INITIAL_MS` - First reconnect delay (default: 500)
//! - `REALTIME_BACKOFF_MAX_MS` - Reconnect delay cap (default: 30000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::checkout::DEFAULT_TAX_RATE;
use crate::notifications::DEFAULT_NOTIFICATION_CAPACITY;
use crate::realtime::BackoffPolicy;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Directory holding persisted cart state
    pub data_dir: PathBuf,
    /// Maximum notifications retained
    pub notification_capacity: NonZeroUsize,
    /// Tax rate applied at checkout
    pub tax_rate: Decimal,
    /// Change-feed reconnect settings
    pub realtime: RealtimeConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Change-feed reconnect settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeConfig {
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            backoff_initial: policy.initial,
            backoff_max: policy.max,
        }
    }
}

impl From<&RealtimeConfig> for BackoffPolicy {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            initial: config.backoff_initial,
            max: config.backoff_max,
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            tax_rate: DEFAULT_TAX_RATE,
            realtime: RealtimeConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed or is
    /// out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed or is
    /// out of range.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let data_dir = get_optional_env(&lookup, "STOREFRONT_DATA_DIR")
            .map_or(defaults.data_dir, PathBuf::from);
        let notification_capacity = get_parsed_or(
            &lookup,
            "STOREFRONT_NOTIFICATION_CAPACITY",
            defaults.notification_capacity,
        )?;

        let tax_rate = get_parsed_or(&lookup, "STOREFRONT_TAX_RATE", defaults.tax_rate)?;
        if tax_rate.is_sign_negative() || tax_rate > Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_TAX_RATE".to_string(),
                format!("must be between 0 and 1 (got {tax_rate})"),
            ));
        }

        let realtime = RealtimeConfig::from_vars(&lookup)?;

        Ok(Self {
            data_dir,
            notification_capacity,
            tax_rate,
            realtime,
            sentry_dsn: get_optional_env(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }
}

impl RealtimeConfig {
    fn from_vars(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let initial_ms = get_parsed_or(
            lookup,
            "REALTIME_BACKOFF_INITIAL_MS",
            duration_millis(defaults.backoff_initial),
        )?;
        let max_ms = get_parsed_or(
            lookup,
            "REALTIME_BACKOFF_MAX_MS",
            duration_millis(defaults.backoff_max),
        )?;

        if initial_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "REALTIME_BACKOFF_INITIAL_MS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        if max_ms < initial_ms {
            return Err(ConfigError::InvalidEnvVar(
                "REALTIME_BACKOFF_MAX_MS".to_string(),
                format!("must be at least REALTIME_BACKOFF_INITIAL_MS ({initial_ms})"),
            ));
        }

        Ok(Self {
            backoff_initial: Duration::from_millis(initial_ms),
            backoff_max: Duration::from_millis(max_ms),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional variable, treating empty values as unset.
fn get_optional_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Parse a variable, falling back to `default` when unset.
fn get_parsed_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(lookup, key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
