//! Remote source trait definition.

use async_trait::async_trait;
use beacon_core::{ConfigKey, ConfigValue};
use indexmap::IndexMap;

use crate::error::{ConnectError, FetchError};

/// A remote store of configuration values and feature flags.
///
/// This trait abstracts over transports (HTTP app-configuration stores,
/// in-process maps for tests) so the cache can fetch batches of keys without
/// knowing the wire format.
///
/// # Implementors
///
/// - [`super::HttpSource`] - Fetches from an HTTP key/value endpoint
/// - [`super::MemorySource`] - In-process map, used by tests and as a
///   static stand-in
///
/// # Example
///
/// ```ignore
/// use beacon_client::source::{RemoteSource, MemorySource};
///
/// let source = MemorySource::new();
/// source.set("FeatureManagement:Coupons", true);
///
/// let keys = vec!["FeatureManagement:Coupons".parse()?];
/// let values = source.fetch(&keys).await?;
/// ```
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Verifies that the source is reachable and the credentials are valid.
    ///
    /// Called once by `connect` before the source is installed on the cache.
    ///
    /// # Errors
    ///
    /// - `ConnectError::InvalidCredentials` if the remote rejects the caller
    /// - `ConnectError::Unreachable` if the remote cannot be contacted
    async fn authenticate(&self) -> Result<(), ConnectError>;

    /// Fetches the given keys in one batch.
    ///
    /// Returns a map of the keys the remote knows about; keys absent from
    /// the result are treated as failed for this batch by the caller.
    ///
    /// # Errors
    ///
    /// A transport, status, or decode failure fails the whole batch.
    async fn fetch(
        &self,
        keys: &[ConfigKey],
    ) -> Result<IndexMap<ConfigKey, ConfigValue>, FetchError>;

    /// Returns the name of this source, for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource;

    #[async_trait]
    impl RemoteSource for StaticSource {
        async fn authenticate(&self) -> Result<(), ConnectError> {
            Ok(())
        }

        async fn fetch(
            &self,
            keys: &[ConfigKey],
        ) -> Result<IndexMap<ConfigKey, ConfigValue>, FetchError> {
            Ok(keys
                .iter()
                .map(|k| (k.clone(), ConfigValue::Bool(true)))
                .collect())
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    #[tokio::test]
    async fn test_trait_object_fetch() {
        let source: Box<dyn RemoteSource> = Box::new(StaticSource);

        let keys = vec![ConfigKey::new("Feature:A").unwrap()];
        let values = source.fetch(&keys).await.unwrap();

        assert_eq!(values.len(), 1);
        assert_eq!(values[&keys[0]].as_bool(), Some(true));
        assert_eq!(source.name(), "static");
    }

    #[tokio::test]
    async fn test_authenticate() {
        let source = StaticSource;
        assert!(source.authenticate().await.is_ok());
    }
}
