//! Cached value bookkeeping.

use std::time::Duration;

use beacon_core::ConfigValue;
use tokio::time::Instant;

/// A single cached configuration value with its freshness window.
///
/// Entries use `tokio::time::Instant` so expiry can be driven by the paused
/// test clock.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The last successfully fetched value.
    pub value: ConfigValue,
    /// When the value was fetched.
    pub fetched_at: Instant,
    /// When the value stops being fresh. A past expiry does not remove the
    /// entry; it keeps being served while a refresh is retried.
    pub expires_at: Instant,
}

impl CacheEntry {
    /// Creates an entry fetched now, fresh for `expiration`.
    pub fn new(value: ConfigValue, expiration: Duration) -> Self {
        let fetched_at = Instant::now();
        Self {
            value,
            fetched_at,
            expires_at: fetched_at + expiration,
        }
    }

    /// Returns true once the freshness window has elapsed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
