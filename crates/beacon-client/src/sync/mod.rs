//! Background refresh: scheduler and state tracking.

pub mod scheduler;
pub mod state;

pub use scheduler::{RefreshConfig, RefreshHandle, RefreshScheduler};
pub use state::RefreshState;
