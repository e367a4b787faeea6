//! Configuration key validation and accessors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error produced when constructing an invalid [`ConfigKey`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    /// The key string was empty.
    #[error("configuration key must not be empty")]
    Empty,

    /// The key contained a segment with no characters (e.g. `"A::B"`).
    #[error("configuration key has an empty segment: {0}")]
    EmptySegment(String),

    /// The key had leading or trailing whitespace.
    #[error("configuration key has surrounding whitespace: {0:?}")]
    Whitespace(String),
}

/// Unique identifier for a remotely managed configuration value.
///
/// Keys are hierarchical, with `:`-separated segments, following the
/// `Section:Name` convention of remote app-configuration stores
/// (e.g. `"FeatureManagement:Coupons"`). Construction validates the shape;
/// comparison is exact (keys are case-sensitive on the wire).
///
/// # Examples
///
/// ```
/// use beacon_core::ConfigKey;
///
/// let key = ConfigKey::new("FeatureManagement:Coupons").unwrap();
/// assert_eq!(key.section(), Some("FeatureManagement"));
/// assert_eq!(key.name(), "Coupons");
/// assert_eq!(key.to_string(), "FeatureManagement:Coupons");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigKey(String);

impl ConfigKey {
    /// Creates a new key, validating that it is non-empty, has no empty
    /// segments, and carries no surrounding whitespace.
    pub fn new(key: impl Into<String>) -> Result<Self, KeyError> {
        let key = key.into();

        if key.is_empty() {
            return Err(KeyError::Empty);
        }
        if key.trim() != key {
            return Err(KeyError::Whitespace(key));
        }
        if key.split(':').any(str::is_empty) {
            return Err(KeyError::EmptySegment(key));
        }

        Ok(Self(key))
    }

    /// Returns the full key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the section (everything before the last `:`), if hierarchical.
    pub fn section(&self) -> Option<&str> {
        self.0.rsplit_once(':').map(|(section, _)| section)
    }

    /// Returns the final segment of the key.
    pub fn name(&self) -> &str {
        self.0.rsplit_once(':').map_or(&self.0, |(_, name)| name)
    }

    /// Iterates over the `:`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(':')
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConfigKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ConfigKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
