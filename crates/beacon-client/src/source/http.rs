//! HTTP remote source implementation.

use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{ConfigKey, ConfigValue};
use indexmap::IndexMap;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::error::{ConnectError, FetchError};
use crate::source::{Credentials, RemoteSource};

/// A remote configuration store reached over HTTP.
///
/// The wire contract is a plain key/value endpoint:
///
/// - `GET {endpoint}/kv?keys=a,b,c` returns a JSON object mapping each known
///   key to its value (`{"FeatureManagement:Coupons": true}`); unknown keys
///   are simply absent from the object.
/// - `GET {endpoint}/health` is used as the authentication probe.
///
/// Credentials are attached to every request.
pub struct HttpSource {
    endpoint: Url,
    credentials: Credentials,
    client: Client,
    timeout: Duration,
}

impl HttpSource {
    /// Creates a new HTTP source against the given endpoint.
    ///
    /// The per-request timeout bounds every fetch attempt at the transport
    /// level; the cache applies its own bound on top of it.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::MissingEndpoint` for an empty endpoint and
    /// `ConnectError::InvalidEndpoint` when the endpoint is not a valid URL.
    pub fn new(
        endpoint: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ConnectError> {
        if endpoint.is_empty() {
            return Err(ConnectError::MissingEndpoint);
        }

        let endpoint = Url::parse(endpoint)
            .map_err(|e| ConnectError::invalid_endpoint(endpoint, e.to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectError::unreachable(e.to_string()))?;

        Ok(Self {
            endpoint,
            credentials,
            client,
            timeout,
        })
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, path: &str) -> Result<Url, FetchError> {
        self.endpoint
            .join(path)
            .map_err(|e| FetchError::transport(e.to_string()))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Credentials::Anonymous => request,
            Credentials::Bearer { token } => request.bearer_auth(token),
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            },
        }
    }

    fn map_fetch_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else if error.is_decode() {
            FetchError::decode(error.to_string())
        } else {
            FetchError::transport(error.to_string())
        }
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn authenticate(&self) -> Result<(), ConnectError> {
        let url = self
            .endpoint
            .join("health")
            .map_err(|e| ConnectError::unreachable(e.to_string()))?;

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| ConnectError::unreachable(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ConnectError::InvalidCredentials {
                    status: response.status().as_u16(),
                })
            },
            status if !status.is_success() => Err(ConnectError::unreachable(format!(
                "health check returned status {status}"
            ))),
            _ => Ok(()),
        }
    }

    async fn fetch(
        &self,
        keys: &[ConfigKey],
    ) -> Result<IndexMap<ConfigKey, ConfigValue>, FetchError> {
        let url = self.url("kv")?;
        let joined = keys
            .iter()
            .map(ConfigKey::as_str)
            .collect::<Vec<_>>()
            .join(",");

        debug!(count = keys.len(), "Fetching keys from remote");

        let response = self
            .authorize(self.client.get(url).query(&[("keys", joined)]))
            .send()
            .await
            .map_err(|e| self.map_fetch_error(e))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FetchError::Unauthorized {
                status: response.status().as_u16(),
            }),
            status if !status.is_success() => Err(FetchError::Status(status.as_u16())),
            _ => response.json().await.map_err(|e| self.map_fetch_error(e)),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
