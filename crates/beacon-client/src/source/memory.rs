//! In-process remote source.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use beacon_core::{ConfigKey, ConfigValue};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::{ConnectError, FetchError};
use crate::source::RemoteSource;

/// A remote source backed by an in-process map.
///
/// Used as a test double and as a stand-in for environments without a real
/// remote store. Counts fetch batches and supports failure injection so
/// tests can assert on refresh behavior.
#[derive(Default)]
pub struct MemorySource {
    values: RwLock<IndexMap<ConfigKey, ConfigValue>>,
    fetch_batches: AtomicU64,
    failing: RwLock<Option<String>>,
}

impl MemorySource {
    /// Creates a new empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, as if it were updated in the remote store.
    pub fn set(&self, key: ConfigKey, value: impl Into<ConfigValue>) {
        self.values.write().insert(key, value.into());
    }

    /// Removes a value from the store.
    pub fn remove(&self, key: &ConfigKey) {
        self.values.write().shift_remove(key);
    }

    /// Returns the number of fetch batches served so far.
    pub fn fetch_batches(&self) -> u64 {
        self.fetch_batches.load(Ordering::SeqCst)
    }

    /// Makes every subsequent fetch fail with a transport error.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failing.write() = Some(reason.into());
    }

    /// Clears a previously injected failure.
    pub fn recover(&self) {
        *self.failing.write() = None;
    }
}

#[async_trait]
impl RemoteSource for MemorySource {
    async fn authenticate(&self) -> Result<(), ConnectError> {
        match self.failing.read().as_ref() {
            Some(reason) => Err(ConnectError::unreachable(reason.clone())),
            None => Ok(()),
        }
    }

    async fn fetch(
        &self,
        keys: &[ConfigKey],
    ) -> Result<IndexMap<ConfigKey, ConfigValue>, FetchError> {
        self.fetch_batches.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.failing.read().as_ref() {
            return Err(FetchError::transport(reason.clone()));
        }

        let values = self.values.read();
        Ok(keys
            .iter()
            .filter_map(|k| values.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
