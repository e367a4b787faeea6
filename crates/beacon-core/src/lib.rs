//! Beacon Core - Domain types
//!
//! This crate provides the foundational types for the Beacon remote
//! configuration cache: validated configuration keys and dynamic values.

pub mod key;
pub mod value;

pub use key::{ConfigKey, KeyError};
pub use value::ConfigValue;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }

    #[test]
    fn version_is_semver() {
        let v = version();
        assert_eq!(v.split('.').count(), 3, "Version should be semver");
    }
}
