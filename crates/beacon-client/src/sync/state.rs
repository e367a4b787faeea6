//! Refresh state tracking.

use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

/// Tracks the outcome of refresh operations for health reporting.
#[derive(Debug)]
pub struct RefreshState {
    /// The last successful refresh time.
    last_refresh: RwLock<Option<Instant>>,
    /// Number of keys updated by the last successful refresh.
    last_refreshed_keys: RwLock<usize>,
    /// The last error message, if any.
    last_error: RwLock<Option<String>>,
    /// Number of consecutive failures.
    failure_count: RwLock<u32>,
}

impl RefreshState {
    /// Creates a new RefreshState.
    pub fn new() -> Self {
        Self {
            last_refresh: RwLock::new(None),
            last_refreshed_keys: RwLock::new(0),
            last_error: RwLock::new(None),
            failure_count: RwLock::new(0),
        }
    }

    /// Returns the time of the last successful refresh.
    pub fn last_refresh(&self) -> Option<Instant> {
        *self.last_refresh.read()
    }

    /// Returns the duration since the last successful refresh.
    pub fn time_since_refresh(&self) -> Option<Duration> {
        self.last_refresh.read().map(|t| t.elapsed())
    }

    /// Returns the number of keys updated by the last successful refresh.
    pub fn last_refreshed_keys(&self) -> usize {
        *self.last_refreshed_keys.read()
    }

    /// Records a successful refresh that updated `count` keys.
    pub fn record_success(&self, count: usize) {
        let mut last_refresh = self.last_refresh.write();
        let mut last_refreshed_keys = self.last_refreshed_keys.write();
        let mut last_error = self.last_error.write();
        let mut failure_count = self.failure_count.write();

        *last_refresh = Some(Instant::now());
        *last_refreshed_keys = count;
        *last_error = None;
        *failure_count = 0;
    }

    /// Records a failed refresh.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut last_error = self.last_error.write();
        let mut failure_count = self.failure_count.write();

        *last_error = Some(error.into());
        *failure_count += 1;
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Returns the number of consecutive failures.
    pub fn failure_count(&self) -> u32 {
        *self.failure_count.read()
    }

    /// Returns true if at least one refresh has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.last_refresh.read().is_some()
    }

    /// Returns true if the cache has refreshed at least once and the latest
    /// attempt did not fail.
    pub fn is_healthy(&self) -> bool {
        self.is_initialized() && self.last_error.read().is_none()
    }
}

impl Default for RefreshState {
    fn default() -> Self {
        Self::new()
    }
}
