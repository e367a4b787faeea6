//! # Beacon Client
//!
//! Client-side cache for remotely managed configuration and feature flags.
//!
//! This crate keeps a local snapshot of key/value configuration fetched from
//! a remote store, serving reads from memory while a background task bounds
//! staleness and remote-call frequency.
//!
//! ## Features
//!
//! - Synchronous, never-blocking reads (stale values are served while a
//!   refresh runs out-of-band)
//! - Per-key expiration overrides over a global default
//! - Sentinel keys whose expiry cascades into a full refresh of every
//!   tracked key
//! - Coalesced refreshes: one batch in flight at a time
//! - Async trait-based remote source abstraction with HTTP and in-memory
//!   backends
//! - Static-only degraded mode when no remote endpoint is configured
//!
//! ## Example
//!
//! ```ignore
//! use beacon_client::{bootstrap, ClientSettings};
//!
//! let settings = ClientSettings::load()?;
//! let runtime = bootstrap(&settings).await?;
//!
//! let coupons = "FeatureManagement:Coupons".parse()?;
//! if runtime.cache().is_enabled(&coupons) {
//!     // feature-gated behavior
//! }
//! ```

pub mod bootstrap;
pub mod cache;
pub mod error;
pub mod metrics;
pub mod settings;
pub mod source;
pub mod sync;

// Re-exports
pub use bootstrap::{CacheRuntime, bootstrap};
pub use cache::{CacheEntry, CacheOptions, KeyRegistry, RemoteConfigCache, TrackedKey};
pub use error::{BootstrapError, ConnectError, FetchError, RefreshError};
pub use metrics::{CacheMetrics, register_cache_metrics};
pub use settings::{ClientSettings, SentinelSpec};
pub use source::{Credentials, HttpSource, MemorySource, RemoteSource};
pub use sync::{RefreshConfig, RefreshHandle, RefreshScheduler, RefreshState};

// Re-export beacon_core for consumers
pub use beacon_core;
