//! Background refresh scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::cache::RemoteConfigCache;

/// Configuration for the refresh scheduler.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Polling interval between due-key checks. Per-key expiration is
    /// resolved inside the cache; the ticker only bounds how quickly an
    /// expiry is noticed without a read.
    pub poll_interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// Handle for controlling a running refresh scheduler.
pub struct RefreshHandle {
    /// Sender to signal shutdown.
    shutdown_tx: watch::Sender<bool>,
}

impl RefreshHandle {
    /// Signals the scheduler to stop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Background task that keeps the cache snapshot fresh.
///
/// Wakes on a fixed ticker and on stale-read signals from the cache; both
/// paths funnel into `RemoteConfigCache::refresh`, which coalesces overlaps
/// and only fetches due keys, so a spurious wake-up is cheap.
pub struct RefreshScheduler {
    /// The cache to refresh.
    cache: Arc<RemoteConfigCache>,
    /// Configuration.
    config: RefreshConfig,
}

impl RefreshScheduler {
    /// Creates a new refresh scheduler.
    pub fn new(cache: Arc<RemoteConfigCache>, config: RefreshConfig) -> Self {
        Self { cache, config }
    }

    /// Creates a scheduler with default configuration.
    pub fn with_defaults(cache: Arc<RemoteConfigCache>) -> Self {
        Self::new(cache, RefreshConfig::default())
    }

    /// Starts the background refresh task.
    ///
    /// Returns a handle that can be used to stop the scheduler.
    pub fn start(self) -> RefreshHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = RefreshHandle { shutdown_tx };

        tokio::spawn(self.run(shutdown_rx));

        handle
    }

    /// Runs the scheduler loop.
    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.poll_interval);
        // The first tick fires immediately; skip it so the initial load done
        // by bootstrap is not duplicated
        ticker.tick().await;

        info!(
            "Starting refresh scheduler with poll interval {:?}",
            self.config.poll_interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.do_refresh("tick").await;
                }
                _ = self.cache.refresh_signal().notified() => {
                    self.do_refresh("stale read").await;
                }
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!("Refresh scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Performs a single refresh pass.
    async fn do_refresh(&self, trigger: &str) {
        debug!(trigger, "Scheduled refresh pass");

        if let Err(e) = self.cache.refresh().await {
            warn!(trigger, error = %e, "Scheduled refresh failed");
        }
    }
}
