//! Tracked-key registry: expiration intervals and cascade sentinels.

use std::time::Duration;

use beacon_core::ConfigKey;
use indexmap::IndexMap;
use parking_lot::RwLock;

/// Refresh tracking metadata for a registered key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedKey {
    /// The resolved expiration interval for this key.
    pub interval: Duration,
    /// Whether the interval was an explicit per-key override. Explicit
    /// overrides survive later default changes and re-registrations.
    pub explicit: bool,
    /// Whether expiry of this key forces a refresh of every tracked key.
    pub refresh_all: bool,
}

#[derive(Debug)]
struct RegistryInner {
    default_expiration: Duration,
    keys: IndexMap<ConfigKey, TrackedKey>,
}

/// The set of keys the cache keeps fresh.
///
/// Keys registered without an explicit interval capture the default
/// expiration current at registration time; changing the default later only
/// affects keys registered afterwards.
#[derive(Debug)]
pub struct KeyRegistry {
    inner: RwLock<RegistryInner>,
}

impl KeyRegistry {
    /// Creates a registry with the given default expiration interval.
    pub fn new(default_expiration: Duration) -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                default_expiration,
                keys: IndexMap::new(),
            }),
        }
    }

    /// Registers a key for refresh tracking.
    ///
    /// `interval: None` captures the current default. Re-registering a key
    /// that already carries an explicit override without supplying a new one
    /// keeps the existing override.
    pub fn register(&self, key: ConfigKey, refresh_all: bool, interval: Option<Duration>) {
        let mut inner = self.inner.write();
        let default = inner.default_expiration;

        let tracked = match (interval, inner.keys.get(&key)) {
            (Some(interval), _) => TrackedKey {
                interval,
                explicit: true,
                refresh_all,
            },
            (None, Some(existing)) if existing.explicit => TrackedKey {
                interval: existing.interval,
                explicit: true,
                refresh_all,
            },
            (None, _) => TrackedKey {
                interval: default,
                explicit: false,
                refresh_all,
            },
        };

        inner.keys.insert(key, tracked);
    }

    /// Sets the default expiration for keys registered from now on.
    pub fn set_default_expiration(&self, interval: Duration) {
        self.inner.write().default_expiration = interval;
    }

    /// Returns the current default expiration interval.
    pub fn default_expiration(&self) -> Duration {
        self.inner.read().default_expiration
    }

    /// Returns the tracking metadata for a key, if registered.
    pub fn tracked(&self, key: &ConfigKey) -> Option<TrackedKey> {
        self.inner.read().keys.get(key).copied()
    }

    /// Returns the expiration interval for a key (registered interval, or
    /// the current default for untracked keys).
    pub fn expiration_for(&self, key: &ConfigKey) -> Duration {
        let inner = self.inner.read();
        inner
            .keys
            .get(key)
            .map_or(inner.default_expiration, |t| t.interval)
    }

    /// Returns every tracked key with its metadata, in registration order.
    pub fn entries(&self) -> Vec<(ConfigKey, TrackedKey)> {
        self.inner
            .read()
            .keys
            .iter()
            .map(|(k, t)| (k.clone(), *t))
            .collect()
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.inner.read().keys.len()
    }

    /// Returns true when no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.read().keys.is_empty()
    }
}
