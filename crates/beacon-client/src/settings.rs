//! Bootstrap settings for the configuration cache.

use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use beacon_core::ConfigValue;

use crate::source::Credentials;
use crate::sync::RefreshConfig;

/// Declaration of a key to track, as it appears in the settings file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SentinelSpec {
    /// The configuration key to track.
    pub key: String,

    /// Whether expiry of this key forces a refresh of all tracked keys.
    #[serde(default)]
    pub refresh_all: bool,

    /// Per-key expiration override in seconds.
    #[serde(default)]
    pub expiration_secs: Option<u64>,
}

/// Settings controlling the cache, its remote connection, and the refresh
/// schedule.
///
/// Loaded from an optional `beacon` settings file plus `BEACON_`-prefixed
/// environment variables (environment wins), e.g. `BEACON_ENDPOINT` or
/// `BEACON_DEFAULT_EXPIRATION_SECS`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    /// Master switch for remote feature management. When false the cache
    /// never connects and serves static defaults only.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Remote store endpoint. Unset or empty keeps the cache inert.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Credentials presented to the remote store.
    #[serde(default)]
    pub credentials: Credentials,

    /// Default expiration interval in seconds for keys without an override.
    #[serde(default = "default_expiration_secs")]
    pub default_expiration_secs: u64,

    /// Upper bound on a single fetch batch, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Background poll interval in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Keys to register for refresh tracking at startup.
    #[serde(default)]
    pub keys: Vec<SentinelSpec>,

    /// Statically configured fallback values, served when a key has never
    /// been fetched (or the cache is inert).
    #[serde(default)]
    pub defaults: IndexMap<String, ConfigValue>,
}

fn default_true() -> bool {
    true
}

fn default_expiration_secs() -> u64 {
    300
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_secs() -> u64 {
    10
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            credentials: Credentials::Anonymous,
            default_expiration_secs: default_expiration_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            keys: Vec::new(),
            defaults: IndexMap::new(),
        }
    }
}

impl ClientSettings {
    /// Loads settings from the `beacon` settings file (if present) overlaid
    /// with `BEACON_`-prefixed environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(config::File::with_name("beacon").required(false))
    }

    /// Loads settings from an explicit source plus the environment overlay.
    pub fn load_from<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .add_source(
                config::Environment::with_prefix("BEACON")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Startup guard: remote refresh is attempted only when feature
    /// management is enabled AND an endpoint is configured. Anything else
    /// keeps the cache in static-only mode (not an error).
    pub fn remote_enabled(&self) -> bool {
        self.enabled && self.endpoint.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Returns the default expiration interval.
    pub fn default_expiration(&self) -> Duration {
        Duration::from_secs(self.default_expiration_secs)
    }

    /// Returns the fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Returns the scheduler configuration.
    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }
}
