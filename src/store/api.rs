//! HTTP API backend for Playbook variables.
//!
//! [`ApiBackend`] talks to the platform's internal key-value endpoint:
//!
//! ```text
//! PUT /internal/<namespace>/keyValue/<url-encoded key>   (create)
//! GET /internal/<namespace>/keyValue/<url-encoded key>   (read)
//! ```
//!
//! Bodies are `application/octet-stream`; the session context travels in the
//! `DB-Context` header. The endpoint has no delete and no bulk read, so the
//! backend keeps the trait defaults for both and the facade reports deletes
//! as [`DeleteOutcome::Unsupported`](crate::store::DeleteOutcome::Unsupported).

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use url::Url;

use crate::config::ApiBackendConfig;
use crate::constants::{DB_CONTEXT_HEADER, OCTET_STREAM};
use crate::store::backend::{KeyValueBackend, StorageError, WriteAck};

/// HTTP API key-value backend.
///
/// # Examples
///
/// ```
/// use tc_playbook::config::ApiBackendConfig;
/// use tc_playbook::store::api::ApiBackend;
///
/// let backend = ApiBackend::new(ApiBackendConfig::new("https://tc.example.com/api")).unwrap();
/// assert_eq!(
///     backend.url_for("#App:1:ip!String"),
///     "https://tc.example.com/api/internal/playbooks/keyValue/%23App%3A1%3Aip%21String"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ApiBackend {
    client: reqwest::Client,
    base_url: String,
    namespace: String,
    token: Option<String>,
}

impl ApiBackend {
    /// Creates a backend with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if `base_url` is not a valid URL or
    /// the HTTP client cannot be built.
    pub fn new(config: ApiBackendConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StorageError::backend(format!("failed to create HTTP client: {e}"), e))?;
        Self::with_client(config, client)
    }

    /// Creates a backend from an existing reqwest client.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if `base_url` is not a valid URL.
    pub fn with_client(config: ApiBackendConfig, client: reqwest::Client) -> Result<Self, StorageError> {
        let parsed = Url::parse(&config.base_url).map_err(|e| {
            StorageError::backend(format!("invalid API base URL {}: {e}", config.base_url), e)
        })?;
        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            namespace: config.namespace,
            token: config.token,
        })
    }

    /// Endpoint URL for a variable key.
    pub fn url_for(&self, key: &str) -> String {
        format!(
            "{}/internal/{}/keyValue/{}",
            self.base_url,
            self.namespace,
            urlencoding::encode(key)
        )
    }

    fn request(&self, method: reqwest::Method, context: &str, key: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url_for(key))
            .header(DB_CONTEXT_HEADER, context);
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, token);
        }
        builder
    }
}

/// Maps a transport error to a [`StorageError::Backend`].
fn map_http_error(err: reqwest::Error, key: &str) -> StorageError {
    StorageError::backend(format!("HTTP error for key {key}: {err}"), err)
}

#[async_trait]
impl KeyValueBackend for ApiBackend {
    async fn create(&self, context: &str, key: &str, value: &[u8]) -> Result<WriteAck, StorageError> {
        let response = self
            .request(reqwest::Method::PUT, context, key)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(value.to_vec())
            .send()
            .await
            .map_err(|e| map_http_error(e, key))?;

        if !response.status().is_success() {
            return Err(StorageError::InvalidResponse {
                key: key.to_string(),
                message: format!("create returned status {}", response.status()),
            });
        }
        Ok(WriteAck::Accepted)
    }

    async fn read(&self, context: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let response = self
            .request(reqwest::Method::GET, context, key)
            .send()
            .await
            .map_err(|e| map_http_error(e, key))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StorageError::InvalidResponse {
                key: key.to_string(),
                message: format!("read returned status {status}"),
            });
        }

        let body = response.bytes().await.map_err(|e| map_http_error(e, key))?;
        if body.is_empty() {
            return Ok(None);
        }
        Ok(Some(body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_escapes_variable_characters() {
        let backend = ApiBackend::new(ApiBackendConfig::new("http://localhost:8080/")).unwrap();
        assert_eq!(
            backend.url_for("#App:7:list[0]!StringArray"),
            "http://localhost:8080/internal/playbooks/keyValue/%23App%3A7%3Alist%5B0%5D%21StringArray"
        );
    }

    #[test]
    fn custom_namespace() {
        let config = ApiBackendConfig::new("http://localhost").with_namespace("runtime");
        let backend = ApiBackend::new(config).unwrap();
        assert!(backend.url_for("k").ends_with("/internal/runtime/keyValue/k"));
    }

    #[test]
    fn invalid_base_url_is_backend_error() {
        let err = ApiBackend::new(ApiBackendConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, StorageError::Backend { .. }));
    }

    #[test]
    fn no_delete_capability() {
        let backend = ApiBackend::new(ApiBackendConfig::new("http://localhost")).unwrap();
        assert!(!backend.supports_delete());
    }
}
