use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Represents a remotely managed configuration value.
///
/// Feature flags arrive as booleans; generic settings arrive as strings or
/// numbers. The untagged serde representation lets a remote JSON document
/// (`{"FeatureManagement:Coupons": true, "Retry:Max": 5}`) deserialize
/// directly into a map of `ConfigValue`.
///
/// # Example
///
/// ```
/// use beacon_core::ConfigValue;
///
/// let flag: ConfigValue = true.into();
/// assert_eq!(flag.as_bool(), Some(true));
///
/// let setting: ConfigValue = "http://seq".into();
/// assert_eq!(setting.as_str(), Some("http://seq"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Null value (key exists remotely but carries no value)
    Null,
    /// Boolean value (feature flag)
    Bool(bool),
    /// Integer value (signed 64-bit)
    Integer(i64),
    /// Floating point value (wrapped in OrderedFloat for Eq support)
    Float(OrderedFloat<f64>),
    /// String value (generic setting)
    String(String),
}

impl ConfigValue {
    /// Returns true if the value is Null.
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Returns the value as a bool if it matches.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an i64 if it matches.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as an f64 if it matches (Integer or Float).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(f.into_inner()),
            ConfigValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the value as a str if it matches.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }
}

// ==========================================
// From Conversions for Ergonomics
// ==========================================

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Integer(v)
    }
}

impl From<i32> for ConfigValue {
    fn from(v: i32) -> Self {
        ConfigValue::Integer(v as i64)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(OrderedFloat(v))
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::String(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::String(v.to_string())
    }
}
