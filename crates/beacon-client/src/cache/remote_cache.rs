//! Remote configuration cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use beacon_core::{ConfigKey, ConfigValue};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::entry::CacheEntry;
use crate::cache::registry::KeyRegistry;
use crate::error::{ConnectError, FetchError, RefreshError};
use crate::metrics::CacheMetrics;
use crate::source::{Credentials, HttpSource, RemoteSource};
use crate::sync::RefreshState;

/// Construction options for [`RemoteConfigCache`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Default expiration interval for keys registered without an override
    /// (default: 300s = 5 minutes).
    pub default_expiration: Duration,
    /// Upper bound on a single fetch batch (default: 10s). A fetch that
    /// exceeds it counts as a failed refresh.
    pub fetch_timeout: Duration,
    /// Statically configured fallback values, served for keys that have
    /// never been fetched. This is what reads degrade to when no remote
    /// source is connected.
    pub static_defaults: IndexMap<ConfigKey, ConfigValue>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            default_expiration: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(10),
            static_defaults: IndexMap::new(),
        }
    }
}

/// A local snapshot of remotely managed configuration, refreshed in batches.
///
/// Reads are synchronous and never touch the network: they are answered from
/// the in-memory snapshot, serving expired values while a refresh happens
/// out-of-band (stale-but-served). Refreshes fetch every due key in one
/// batch and swap the snapshot atomically, so readers observe either the
/// fully-old or fully-new set of a multi-key cascade.
///
/// Without a connected source the cache is inert: no background activity,
/// reads fall back to [`CacheOptions::static_defaults`].
///
/// # Examples
///
/// ```no_run
/// use beacon_client::cache::{CacheOptions, RemoteConfigCache};
/// use beacon_client::source::Credentials;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), beacon_client::error::ConnectError> {
/// let cache = RemoteConfigCache::new(CacheOptions::default());
/// cache.connect("https://config.example.com/", Credentials::bearer("tok")).await?;
///
/// let key = "FeatureManagement:Coupons".parse().unwrap();
/// cache.register_refresh_key(key, true, Some(std::time::Duration::from_secs(30)));
/// cache.refresh().await.ok();
/// # Ok(())
/// # }
/// ```
pub struct RemoteConfigCache {
    snapshot: RwLock<Arc<IndexMap<ConfigKey, CacheEntry>>>,
    registry: KeyRegistry,
    source: RwLock<Option<Arc<dyn RemoteSource>>>,
    state: RefreshState,
    metrics: CacheMetrics,
    refresh_wanted: Notify,
    refresh_in_flight: AtomicBool,
    fetch_timeout: Duration,
    static_defaults: IndexMap<ConfigKey, ConfigValue>,
}

/// Resets the in-flight flag even when the refresh errors out.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl RemoteConfigCache {
    /// Creates a new cache with the given options. The cache starts inert;
    /// call [`connect`](Self::connect) to enable remote refreshes.
    pub fn new(options: CacheOptions) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(IndexMap::new())),
            registry: KeyRegistry::new(options.default_expiration),
            source: RwLock::new(None),
            state: RefreshState::new(),
            metrics: CacheMetrics::new(),
            refresh_wanted: Notify::new(),
            refresh_in_flight: AtomicBool::new(false),
            fetch_timeout: options.fetch_timeout,
            static_defaults: options.static_defaults,
        }
    }

    /// Connects to an HTTP remote store and authenticates against it.
    ///
    /// # Errors
    ///
    /// `ConnectError` when the endpoint is empty or invalid, the remote is
    /// unreachable, or the credentials are rejected. The cache stays usable
    /// in static-only mode after a failed connect.
    pub async fn connect(
        &self,
        endpoint: &str,
        credentials: Credentials,
    ) -> Result<(), ConnectError> {
        let source = HttpSource::new(endpoint, credentials, self.fetch_timeout)?;
        self.connect_source(Arc::new(source)).await
    }

    /// Installs an arbitrary remote source after authenticating it.
    pub async fn connect_source(&self, source: Arc<dyn RemoteSource>) -> Result<(), ConnectError> {
        source.authenticate().await?;
        info!(source = source.name(), "Remote configuration source connected");
        *self.source.write() = Some(source);
        Ok(())
    }

    /// Returns true when a remote source is installed.
    pub fn is_connected(&self) -> bool {
        self.source.read().is_some()
    }

    /// Marks a key as tracked for refresh.
    ///
    /// `refresh_all = true` makes the key a freshness sentinel: when it
    /// expires, the whole tracked set is refreshed in the same batch.
    /// `interval: None` captures the current default expiration.
    pub fn register_refresh_key(
        &self,
        key: ConfigKey,
        refresh_all: bool,
        interval: Option<Duration>,
    ) {
        debug!(key = %key, refresh_all, ?interval, "Key registered for refresh tracking");
        self.registry.register(key, refresh_all, interval);
    }

    /// Sets the default expiration for keys registered from now on.
    pub fn set_default_expiration(&self, interval: Duration) {
        self.registry.set_default_expiration(interval);
    }

    /// Returns the last cached value for `key`, or the static default when
    /// never fetched, or `None`.
    ///
    /// Never blocks on remote I/O. An expired entry is served as-is while
    /// the background refresher is woken to replace it.
    pub fn get(&self, key: &ConfigKey) -> Option<ConfigValue> {
        let snapshot = Arc::clone(&self.snapshot.read());

        if let Some(entry) = snapshot.get(key) {
            if entry.is_expired() {
                self.metrics.record_stale_serve();
                self.request_refresh();
            } else {
                self.metrics.record_hit();
            }
            return Some(entry.value.clone());
        }

        // Never fetched: a tracked key still nudges the refresher so the
        // next tick picks it up.
        if self.registry.tracked(key).is_some() {
            self.request_refresh();
        }

        if let Some(default) = self.static_defaults.get(key) {
            self.metrics.record_hit();
            return Some(default.clone());
        }

        self.metrics.record_miss();
        None
    }

    /// Feature-flag convenience: true only when the cached value is
    /// boolean true. Unset or non-boolean values gate the feature off.
    pub fn is_enabled(&self, key: &ConfigKey) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Re-fetches every key whose expiry has elapsed, widening to the whole
    /// tracked set when a due key is a `refresh_all` sentinel.
    ///
    /// Successfully fetched values are swapped into the snapshot in one
    /// atomic batch. Keys the remote did not return keep their previous
    /// value and past expiry, so the next read re-triggers a refresh.
    ///
    /// Only one refresh runs at a time: a call arriving while one is in
    /// flight coalesces into it and returns `Ok` immediately. With no source
    /// connected the call is a no-op.
    ///
    /// # Errors
    ///
    /// `RefreshError::Fetch` when the whole batch failed,
    /// `RefreshError::Partial` when some keys were not returned. Either way
    /// no previously cached value is lost.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        let Some(source) = self.source.read().clone() else {
            return Ok(());
        };

        if self
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Refresh already in flight, coalescing");
            return Ok(());
        }
        let _guard = InFlightGuard(&self.refresh_in_flight);

        let due = self.due_keys();
        if due.is_empty() {
            return Ok(());
        }

        debug!(source = source.name(), count = due.len(), "Refresh started");
        let start = Instant::now();

        let fetched = match tokio::time::timeout(self.fetch_timeout, source.fetch(&due)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                seconds: self.fetch_timeout.as_secs(),
            }),
        };

        let values = match fetched {
            Ok(values) => values,
            Err(e) => {
                warn!(error = %e, "Refresh failed");
                self.state.record_failure(e.to_string());
                self.metrics.record_refresh(start.elapsed(), true);
                return Err(RefreshError::Fetch(e));
            },
        };

        let mut failed = Vec::new();
        {
            let current = Arc::clone(&self.snapshot.read());
            let mut next = (*current).clone();

            for key in &due {
                match values.get(key) {
                    Some(value) => {
                        let expiration = self.registry.expiration_for(key);
                        next.insert(key.clone(), CacheEntry::new(value.clone(), expiration));
                    },
                    None => failed.push(key.clone()),
                }
            }

            let mut snapshot = self.snapshot.write();
            *snapshot = Arc::new(next);
            self.metrics.update_entry_count(snapshot.len() as u64);
        }

        let updated = due.len() - failed.len();

        if failed.is_empty() {
            info!(count = updated, "Refresh succeeded");
            self.state.record_success(updated);
            self.metrics.record_refresh(start.elapsed(), false);
            Ok(())
        } else {
            warn!(
                updated,
                failed = failed.len(),
                "Refresh left keys stale, will retry on next read"
            );
            self.state
                .record_failure(format!("{} key(s) not returned by remote", failed.len()));
            self.metrics.record_refresh(start.elapsed(), true);
            Err(RefreshError::Partial { failed })
        }
    }

    /// Computes the fetch batch: every tracked key whose entry is missing or
    /// expired; the full tracked set when any due key is a sentinel. When
    /// sentinels carry different intervals, the earliest-expiring one drives
    /// the cascade.
    fn due_keys(&self) -> Vec<ConfigKey> {
        let snapshot = Arc::clone(&self.snapshot.read());
        let entries = self.registry.entries();

        let mut cascade = false;
        let mut due = Vec::new();

        for (key, tracked) in &entries {
            let expired = snapshot.get(key).is_none_or(CacheEntry::is_expired);
            if expired {
                if tracked.refresh_all {
                    cascade = true;
                }
                due.push(key.clone());
            }
        }

        if cascade {
            entries.into_iter().map(|(key, _)| key).collect()
        } else {
            due
        }
    }

    fn request_refresh(&self) {
        // Inert without a source: never wake the scheduler, never fetch
        if self.is_connected() {
            self.refresh_wanted.notify_one();
        }
    }

    /// Notify handle the background scheduler waits on for stale-read
    /// wake-ups.
    pub(crate) fn refresh_signal(&self) -> &Notify {
        &self.refresh_wanted
    }

    /// Returns the refresh state for health reporting.
    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    /// Returns the metrics recorder.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Returns the number of cached entries (excluding static defaults).
    pub fn entry_count(&self) -> usize {
        self.snapshot.read().len()
    }

    /// Returns the registry of tracked keys.
    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn key(s: &str) -> ConfigKey {
        ConfigKey::new(s).unwrap()
    }

    async fn connected_cache(options: CacheOptions) -> (Arc<RemoteConfigCache>, Arc<MemorySource>) {
        let cache = Arc::new(RemoteConfigCache::new(options));
        let source = Arc::new(MemorySource::new());
        cache
            .connect_source(Arc::clone(&source) as Arc<dyn RemoteSource>)
            .await
            .unwrap();
        (cache, source)
    }

    #[tokio::test]
    async fn test_never_fetched_key_returns_none() {
        let cache = RemoteConfigCache::new(CacheOptions::default());
        assert_eq!(cache.get(&key("Feature:Unknown")), None);
        assert_eq!(cache.metrics().misses(), 1);
    }

    #[tokio::test]
    async fn test_static_default_served_when_never_fetched() {
        let mut options = CacheOptions::default();
        options
            .static_defaults
            .insert(key("Feature:Coupons"), ConfigValue::Bool(false));

        let cache = RemoteConfigCache::new(options);
        assert_eq!(
            cache.get(&key("Feature:Coupons")),
            Some(ConfigValue::Bool(false))
        );
        assert!(!cache.is_enabled(&key("Feature:Coupons")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_populates_and_serves_fresh() {
        let (cache, source) = connected_cache(CacheOptions::default()).await;
        source.set(key("Feature:A"), true);

        cache.register_refresh_key(key("Feature:A"), false, Some(Duration::from_secs(30)));
        cache.refresh().await.unwrap();

        assert_eq!(cache.get(&key("Feature:A")), Some(ConfigValue::Bool(true)));
        assert!(cache.is_enabled(&key("Feature:A")));
        assert_eq!(source.fetch_batches(), 1);

        // Within the freshness window a refresh is a no-op
        tokio::time::advance(Duration::from_secs(10)).await;
        cache.refresh().await.unwrap();
        assert_eq!(source.fetch_batches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_value_is_served_stale() {
        let (cache, source) = connected_cache(CacheOptions::default()).await;
        source.set(key("Feature:A"), true);

        cache.register_refresh_key(key("Feature:A"), false, Some(Duration::from_secs(5)));
        cache.refresh().await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;

        // Stale but still served; the read never returns None here
        assert_eq!(cache.get(&key("Feature:A")), Some(ConfigValue::Bool(true)));
        assert_eq!(cache.metrics().stale_serves(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_update_visible_after_re_refresh() {
        let (cache, source) = connected_cache(CacheOptions::default()).await;
        source.set(key("Feature:A"), true);

        cache.register_refresh_key(key("Feature:A"), false, Some(Duration::from_secs(5)));
        cache.refresh().await.unwrap();

        source.set(key("Feature:A"), false);
        tokio::time::advance(Duration::from_secs(6)).await;
        cache.refresh().await.unwrap();

        assert_eq!(cache.get(&key("Feature:A")), Some(ConfigValue::Bool(false)));
        assert_eq!(source.fetch_batches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cascade_refreshes_all_tracked_keys() {
        let (cache, source) = connected_cache(CacheOptions::default()).await;
        source.set(key("Sentinel"), 1i64);
        source.set(key("Feature:B"), true);

        cache.register_refresh_key(key("Sentinel"), true, Some(Duration::from_secs(5)));
        cache.register_refresh_key(key("Feature:B"), false, Some(Duration::from_secs(30)));
        cache.refresh().await.unwrap();

        // Only the sentinel expires, but its cascade pulls B into the batch
        source.set(key("Feature:B"), false);
        tokio::time::advance(Duration::from_secs(6)).await;
        cache.refresh().await.unwrap();

        assert_eq!(
            cache.get(&key("Feature:B")),
            Some(ConfigValue::Bool(false)),
            "cascade must refresh B before its own 30s elapse"
        );
        assert_eq!(source.fetch_batches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_expired_sentinels_one_batch() {
        let (cache, source) = connected_cache(CacheOptions::default()).await;
        source.set(key("SentinelA"), 1i64);
        source.set(key("SentinelB"), 2i64);

        cache.register_refresh_key(key("SentinelA"), true, Some(Duration::from_secs(5)));
        cache.register_refresh_key(key("SentinelB"), true, Some(Duration::from_secs(5)));
        cache.refresh().await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        cache.refresh().await.unwrap();

        // Both sentinels were due; the cascade still executes exactly once
        assert_eq!(source.fetch_batches(), 2);
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_previous_values() {
        let (cache, source) = connected_cache(CacheOptions::default()).await;
        source.set(key("Feature:A"), true);

        cache.register_refresh_key(key("Feature:A"), false, Some(Duration::from_secs(0)));
        cache.refresh().await.unwrap();

        source.fail_with("connection reset");
        let result = cache.refresh().await;

        assert!(matches!(result, Err(RefreshError::Fetch(_))));
        assert_eq!(cache.get(&key("Feature:A")), Some(ConfigValue::Bool(true)));
        assert!(!cache.state().is_healthy());
        assert_eq!(cache.state().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_reported_as_partial() {
        let (cache, source) = connected_cache(CacheOptions::default()).await;
        source.set(key("Feature:A"), true);

        cache.register_refresh_key(key("Feature:A"), false, None);
        cache.register_refresh_key(key("Feature:Gone"), false, None);

        let result = cache.refresh().await;
        match result {
            Err(RefreshError::Partial { failed }) => {
                assert_eq!(failed, vec![key("Feature:Gone")]);
            },
            other => panic!("expected partial refresh, got {other:?}"),
        }

        // The present key was still swapped in
        assert_eq!(cache.get(&key("Feature:A")), Some(ConfigValue::Bool(true)));
        // The missing key stays due, so the next refresh retries it
        source.set(key("Feature:Gone"), false);
        cache.refresh().await.unwrap();
        assert_eq!(
            cache.get(&key("Feature:Gone")),
            Some(ConfigValue::Bool(false))
        );
    }

    #[tokio::test]
    async fn test_disconnected_cache_is_inert() {
        let cache = RemoteConfigCache::new(CacheOptions::default());
        cache.register_refresh_key(key("Feature:A"), true, Some(Duration::from_secs(0)));

        // refresh is a no-op without a source
        cache.refresh().await.unwrap();
        assert_eq!(cache.get(&key("Feature:A")), None);
        assert_eq!(cache.entry_count(), 0);
        assert!(!cache.is_connected());
    }

    #[tokio::test]
    async fn test_connect_rejects_unreachable_source() {
        let cache = RemoteConfigCache::new(CacheOptions::default());
        let source = Arc::new(MemorySource::new());
        source.fail_with("dns failure");

        let result = cache.connect_source(source as Arc<dyn RemoteSource>).await;
        assert!(matches!(result, Err(ConnectError::Unreachable { .. })));
        assert!(!cache.is_connected());
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_endpoint() {
        let cache = RemoteConfigCache::new(CacheOptions::default());
        let result = cache.connect("", Credentials::Anonymous).await;
        assert!(matches!(result, Err(ConnectError::MissingEndpoint)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_coalesce() {
        use std::sync::atomic::AtomicU64;

        // A slow source: the first refresh parks inside fetch while the
        // second call observes the in-flight flag.
        struct SlowSource {
            batches: AtomicU64,
        }

        #[async_trait::async_trait]
        impl RemoteSource for SlowSource {
            async fn authenticate(&self) -> Result<(), ConnectError> {
                Ok(())
            }

            async fn fetch(
                &self,
                keys: &[ConfigKey],
            ) -> Result<IndexMap<ConfigKey, ConfigValue>, FetchError> {
                self.batches.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(keys
                    .iter()
                    .map(|k| (k.clone(), ConfigValue::Bool(true)))
                    .collect())
            }

            fn name(&self) -> &str {
                "slow"
            }
        }

        let cache = Arc::new(RemoteConfigCache::new(CacheOptions::default()));
        let source = Arc::new(SlowSource {
            batches: AtomicU64::new(0),
        });
        cache
            .connect_source(Arc::clone(&source) as Arc<dyn RemoteSource>)
            .await
            .unwrap();
        cache.register_refresh_key(key("Sentinel"), true, Some(Duration::from_secs(5)));

        let first = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.refresh().await }
        });
        tokio::task::yield_now().await;

        // Second trigger while the first is parked in fetch: coalesced no-op
        cache.refresh().await.unwrap();

        first.await.unwrap().unwrap();
        assert_eq!(source.batches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_retains_previous_value() {
        use std::sync::atomic::AtomicU64;

        // Answers the first fetch, then stalls past any timeout.
        struct StuckSource {
            calls: AtomicU64,
        }

        #[async_trait::async_trait]
        impl RemoteSource for StuckSource {
            async fn authenticate(&self) -> Result<(), ConnectError> {
                Ok(())
            }

            async fn fetch(
                &self,
                keys: &[ConfigKey],
            ) -> Result<IndexMap<ConfigKey, ConfigValue>, FetchError> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Ok(keys
                        .iter()
                        .map(|k| (k.clone(), ConfigValue::Bool(true)))
                        .collect());
                }
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(IndexMap::new())
            }

            fn name(&self) -> &str {
                "stuck"
            }
        }

        let cache = RemoteConfigCache::new(CacheOptions {
            fetch_timeout: Duration::from_secs(2),
            ..CacheOptions::default()
        });
        let source = Arc::new(StuckSource {
            calls: AtomicU64::new(0),
        });
        cache
            .connect_source(Arc::clone(&source) as Arc<dyn RemoteSource>)
            .await
            .unwrap();
        cache.register_refresh_key(key("Feature:A"), false, Some(Duration::from_secs(5)));

        cache.refresh().await.unwrap();
        assert_eq!(cache.get(&key("Feature:A")), Some(ConfigValue::Bool(true)));

        tokio::time::advance(Duration::from_secs(6)).await;
        let result = cache.refresh().await;
        assert!(matches!(
            result,
            Err(RefreshError::Fetch(FetchError::Timeout { seconds: 2 }))
        ));

        // The timed-out batch must not evict the stale value
        assert_eq!(cache.get(&key("Feature:A")), Some(ConfigValue::Bool(true)));
        assert_eq!(cache.metrics().stale_serves(), 1);
        assert_eq!(cache.state().failure_count(), 1);

        // Still expired, so the next cycle tries the remote again
        let retry = cache.refresh().await;
        assert!(retry.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.state().failure_count(), 2);
    }
}
