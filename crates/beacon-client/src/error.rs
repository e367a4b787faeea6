//! Error types for the remote configuration cache.

use beacon_core::ConfigKey;

/// Errors that can occur while establishing the remote capability.
///
/// A `ConnectError` is fatal to the cache's remote side only: the cache
/// itself keeps serving statically seeded values.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// No endpoint was configured.
    #[error("remote endpoint is not configured")]
    MissingEndpoint,

    /// The endpoint could not be parsed as a URL.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The remote rejected the supplied credentials.
    #[error("remote rejected credentials (status {status})")]
    InvalidCredentials { status: u16 },

    /// The remote could not be reached.
    #[error("remote unreachable: {reason}")]
    Unreachable { reason: String },
}

impl ConnectError {
    /// Creates a new invalid endpoint error.
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new unreachable error.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during a single fetch attempt.
///
/// Fetch errors are transient by design: they are logged, the previous
/// value is retained, and the next scheduled tick or read-triggered refresh
/// retries. They never surface to readers.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The fetch did not complete within the configured timeout.
    #[error("fetch timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The remote rejected the request credentials.
    #[error("fetch unauthorized (status {status})")]
    Unauthorized { status: u16 },

    /// The remote answered with a non-success status.
    #[error("remote answered with status {0}")]
    Status(u16),

    /// A transport-level failure occurred.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Creates a new transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a new decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Returns true if this error might succeed on retry.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Unauthorized { .. } | Self::Decode(_))
    }
}

/// Aggregate result of an explicit refresh operation.
///
/// Returned from `refresh()` for observability; never crosses the read path.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The whole fetch batch failed; no entry was updated.
    #[error("refresh batch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Some keys were not returned by the remote; their previous values and
    /// past expiries were retained.
    #[error("refresh left {} key(s) stale: {}", failed.len(), format_keys(failed))]
    Partial { failed: Vec<ConfigKey> },
}

/// Errors raised while running the startup sequence.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The settings could not be loaded or parsed.
    #[error("failed to load settings: {0}")]
    Settings(#[from] config::ConfigError),

    /// A declared key is not a valid configuration key.
    #[error("invalid key in settings: {0}")]
    InvalidKey(#[from] beacon_core::KeyError),

    /// The remote connection could not be established.
    #[error(transparent)]
    Connect(#[from] ConnectError),
}

fn format_keys(keys: &[ConfigKey]) -> String {
    keys.iter()
        .map(ConfigKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
