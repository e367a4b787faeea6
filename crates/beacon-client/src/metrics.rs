//! Cache metrics recording.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Registers metric descriptions. Call once at startup.
pub fn register_cache_metrics() {
    metrics::describe_counter!("beacon_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!("beacon_cache_misses_total", "Total number of cache misses");
    metrics::describe_counter!(
        "beacon_cache_stale_serves_total",
        "Reads answered with an expired value while a refresh was pending"
    );
    metrics::describe_counter!("beacon_refresh_total", "Total number of refresh batches");
    metrics::describe_counter!(
        "beacon_refresh_failures_total",
        "Refresh batches that failed entirely or partially"
    );
    metrics::describe_gauge!("beacon_cache_entries", "Current number of cached entries");
    metrics::describe_histogram!(
        "beacon_refresh_duration_seconds",
        "Time spent fetching and swapping a refresh batch"
    );
}

/// Metrics recorder for the remote configuration cache.
///
/// Keeps atomic mirrors of the counters that tests and health reporting read
/// directly, alongside the `metrics` facade emission.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    stale_serves: Arc<AtomicU64>,
    refreshes: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a read answered from a fresh entry.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("beacon_cache_hits_total").increment(1);
    }

    /// Records a read for a key with no cached value.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("beacon_cache_misses_total").increment(1);
    }

    /// Records a read answered with an expired value.
    pub fn record_stale_serve(&self) {
        self.stale_serves.fetch_add(1, Ordering::Relaxed);
        counter!("beacon_cache_stale_serves_total").increment(1);
    }

    /// Records a completed refresh batch.
    pub fn record_refresh(&self, duration: Duration, failed: bool) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        counter!("beacon_refresh_total").increment(1);
        if failed {
            counter!("beacon_refresh_failures_total").increment(1);
        }
        histogram!("beacon_refresh_duration_seconds").record(duration.as_secs_f64());
    }

    /// Updates the cached entry gauge.
    pub fn update_entry_count(&self, count: u64) {
        gauge!("beacon_cache_entries").set(count as f64);
    }

    /// Hit rate over hits and misses (for logging/debugging).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn stale_serves(&self) -> u64 {
        self.stale_serves.load(Ordering::Relaxed)
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }
}
