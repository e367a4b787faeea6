//! Shared helpers for integration tests.

use std::sync::Arc;

use beacon_client::cache::{CacheOptions, RemoteConfigCache};
use beacon_client::source::{MemorySource, RemoteSource};
use beacon_core::ConfigKey;
use tracing_subscriber::EnvFilter;

/// Installs the log subscriber for the test binary. Safe to call from every
/// test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}

/// Parses a key, panicking on invalid input (test-only).
pub fn key(s: &str) -> ConfigKey {
    s.parse().expect("valid test key")
}

/// Builds a cache connected to a fresh in-memory source.
pub async fn connected_cache(options: CacheOptions) -> (Arc<RemoteConfigCache>, Arc<MemorySource>) {
    init_tracing();

    let cache = Arc::new(RemoteConfigCache::new(options));
    let source = Arc::new(MemorySource::new());

    cache
        .connect_source(Arc::clone(&source) as Arc<dyn RemoteSource>)
        .await
        .expect("memory source connects");

    (cache, source)
}
