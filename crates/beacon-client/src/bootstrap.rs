//! Startup sequence for the configuration cache.
//!
//! Runs an explicit, ordered sequence: build static options from settings,
//! construct the cache, check the remote guard, connect, register sentinel
//! keys, run the initial load, start the background ticker.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::ConfigKey;
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::cache::{CacheOptions, RemoteConfigCache};
use crate::error::BootstrapError;
use crate::settings::ClientSettings;
use crate::sync::{RefreshHandle, RefreshScheduler};

/// A running cache: the cache itself plus the background refresh handle.
///
/// Dropping the runtime stops the scheduler; in-flight refreshes complete or
/// abandon without affecting correctness (nothing is persisted).
pub struct CacheRuntime {
    cache: Arc<RemoteConfigCache>,
    refresh_handle: Option<RefreshHandle>,
}

impl CacheRuntime {
    /// Returns the cache for configuration reads.
    pub fn cache(&self) -> &Arc<RemoteConfigCache> {
        &self.cache
    }

    /// Returns true when background refresh is running.
    pub fn is_refreshing(&self) -> bool {
        self.refresh_handle.is_some()
    }

    /// Stops background refresh, keeping the cache readable.
    pub fn stop_refresh(&mut self) {
        if let Some(handle) = self.refresh_handle.take() {
            handle.stop();
        }
    }
}

/// Builds and starts a cache from the given settings.
///
/// When the remote guard fails (feature management disabled, or no
/// endpoint), the returned runtime is inert: reads serve the settings'
/// static defaults, no background task is spawned, and no remote call is
/// ever made. This is the supported degraded mode, not an error.
///
/// A failed initial load is logged and tolerated; the retry-on-read policy
/// recovers once the remote becomes reachable.
///
/// # Errors
///
/// `BootstrapError` when a declared key is invalid or the remote rejects
/// the connection outright (bad endpoint or credentials).
pub async fn bootstrap(settings: &ClientSettings) -> Result<CacheRuntime, BootstrapError> {
    // 1. Static options from settings
    let mut static_defaults = IndexMap::new();
    for (key, value) in &settings.defaults {
        static_defaults.insert(ConfigKey::new(key.clone())?, value.clone());
    }

    let cache = Arc::new(RemoteConfigCache::new(CacheOptions {
        default_expiration: settings.default_expiration(),
        fetch_timeout: settings.fetch_timeout(),
        static_defaults,
    }));

    // 2. Remote guard: without it the cache stays fully inert
    if !settings.remote_enabled() {
        info!("Remote feature management disabled, serving static defaults only");
        return Ok(CacheRuntime {
            cache,
            refresh_handle: None,
        });
    }

    // 3. Connect (guard guarantees the endpoint is present)
    let endpoint = settings.endpoint.as_deref().unwrap_or_default();
    cache.connect(endpoint, settings.credentials.clone()).await?;

    // 4. Register sentinel keys
    for spec in &settings.keys {
        let key = ConfigKey::new(spec.key.clone())?;
        let interval = spec.expiration_secs.map(Duration::from_secs);
        cache.register_refresh_key(key, spec.refresh_all, interval);
    }

    // 5. Initial synchronous load
    if let Err(e) = cache.refresh().await {
        warn!(error = %e, "Initial configuration load incomplete, will retry");
    } else {
        info!(
            keys = cache.entry_count(),
            "Initial configuration load complete"
        );
    }

    // 6. Background ticker
    let scheduler = RefreshScheduler::new(Arc::clone(&cache), settings.refresh_config());
    let refresh_handle = Some(scheduler.start());

    Ok(CacheRuntime {
        cache,
        refresh_handle,
    })
}
