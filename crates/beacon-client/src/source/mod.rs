//! Remote configuration sources.

pub mod http;
pub mod memory;
pub mod traits;

pub use http::HttpSource;
pub use memory::MemorySource;
pub use traits::RemoteSource;

use serde::{Deserialize, Serialize};

/// Credentials presented to the remote configuration store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Credentials {
    /// No authentication.
    #[default]
    Anonymous,
    /// Bearer token authentication.
    Bearer { token: String },
    /// Basic authentication.
    Basic { username: String, password: String },
}

impl Credentials {
    /// Creates bearer token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Creates basic authentication credentials.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns true when no credentials are configured.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}
