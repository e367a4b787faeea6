//! Local snapshot cache of remote configuration.

pub mod entry;
pub mod registry;
pub mod remote_cache;

pub use entry::CacheEntry;
pub use registry::{KeyRegistry, TrackedKey};
pub use remote_cache::{CacheOptions, RemoteConfigCache};
