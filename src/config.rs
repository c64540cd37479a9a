//! Configuration for the Playbook store and its backends.
//!
//! A [`PlaybookConfig`] is typically loaded once per App invocation, either
//! from a TOML file or from the environment the platform sets up for the
//! App.
//!
//! # Example Configuration File
//!
//! ```toml
//! context = "a5a4b2c1-session"
//! output_variables = "#App:1:ip!String,#App:1:hosts!StringArray"
//!
//! [store]
//! validate = true
//! max_embedded_scan_bytes = 32768
//!
//! [api]
//! base_url = "https://tc.example.com/api"
//! token = "TC-Token abc123"
//!
//! [redis]
//! host = "localhost"
//! port = 6379
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{
    DEFAULT_API_NAMESPACE, DEFAULT_MAX_EMBEDDED_SCAN_BYTES, ENV_API_PATH, ENV_CONTEXT,
    ENV_KVSTORE_HOST, ENV_KVSTORE_PORT, ENV_OUT_VARIABLES, ENV_TOKEN,
};
use crate::error::{PlaybookError, Result};
use crate::output::OutputRequest;

/// Behavior switches for [`PlaybookStore`](crate::playbook::PlaybookStore).
///
/// # Defaults
///
/// | Setting                   | Default | Description                                  |
/// |---------------------------|---------|----------------------------------------------|
/// | `validate`                | `true`  | Structural validation on write               |
/// | `when_requested`          | `true`  | Writes pass through the output gate          |
/// | `resolve_embedded`        | `true`  | Embedded variables resolved on String/KeyValue reads |
/// | `max_embedded_scan_bytes` | 65,536  | Larger texts are returned unresolved         |
///
/// # Examples
///
/// ```
/// use tc_playbook::StoreConfig;
///
/// let config = StoreConfig::default();
/// assert!(config.validate);
/// assert_eq!(config.max_embedded_scan_bytes, 65_536);
///
/// let relaxed = StoreConfig::default().with_validate(false).with_when_requested(false);
/// assert!(!relaxed.validate);
/// assert!(!relaxed.when_requested);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Validate payload structure before writing.
    pub validate: bool,
    /// Only write variables a downstream consumer requested.
    pub when_requested: bool,
    /// Resolve embedded variables on String and KeyValue reads.
    pub resolve_embedded: bool,
    /// Texts longer than this are not scanned for embedded variables.
    pub max_embedded_scan_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            validate: true,
            when_requested: true,
            resolve_embedded: true,
            max_embedded_scan_bytes: DEFAULT_MAX_EMBEDDED_SCAN_BYTES,
        }
    }
}

impl StoreConfig {
    /// Sets structural validation on write.
    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Sets output gating on write.
    pub fn with_when_requested(mut self, when_requested: bool) -> Self {
        self.when_requested = when_requested;
        self
    }

    /// Sets embedded resolution on read.
    pub fn with_resolve_embedded(mut self, resolve_embedded: bool) -> Self {
        self.resolve_embedded = resolve_embedded;
        self
    }

    /// Sets the embedded scan bound.
    pub fn with_max_embedded_scan_bytes(mut self, bytes: usize) -> Self {
        self.max_embedded_scan_bytes = bytes;
        self
    }
}

/// Connection settings for the HTTP API backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiBackendConfig {
    /// Platform API base URL, e.g. `https://tc.example.com/api`.
    pub base_url: String,

    /// Path namespace: `/internal/<namespace>/keyValue/...`.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Complete `Authorization` header value, if the endpoint needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_namespace() -> String {
    DEFAULT_API_NAMESPACE.to_string()
}

fn default_timeout() -> u64 {
    30_000 // 30 seconds
}

impl ApiBackendConfig {
    /// Creates a configuration for `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            namespace: default_namespace(),
            token: None,
            timeout_ms: default_timeout(),
        }
    }

    /// Sets the path namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the `Authorization` header value.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// The request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Connection settings for the Redis hashed backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisBackendConfig {
    /// Redis host.
    pub host: String,
    /// Redis port.
    pub port: u16,
    /// Database index.
    pub db: u32,
}

impl Default for RedisBackendConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
        }
    }
}

impl RedisBackendConfig {
    /// Connection URL, `redis://<host>:<port>/<db>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tc_playbook::config::RedisBackendConfig;
    ///
    /// assert_eq!(RedisBackendConfig::default().url(), "redis://localhost:6379/0");
    /// ```
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Session-level configuration for one App invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybookConfig {
    /// Session context all variables of this invocation live under.
    #[serde(default)]
    pub context: String,

    /// Output variables requested downstream. Accepts a list or the
    /// platform's comma-separated string.
    #[serde(default, deserialize_with = "string_or_list")]
    pub output_variables: Vec<String>,

    /// Store behavior.
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP API backend settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiBackendConfig>,

    /// Redis backend settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisBackendConfig>,
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        String(String),
        List(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::String(raw) => split_csv(&raw),
        StringOrList::List(items) => items,
    })
}

impl PlaybookConfig {
    /// Creates a configuration for `context` with defaults everywhere else.
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Load configuration from the process environment.
    ///
    /// # Example
    ///
    /// ```bash
    /// export TC_PLAYBOOK_KVSTORE_CONTEXT="a5a4b2c1-session"
    /// export TC_PLAYBOOK_OUT_VARIABLES="#App:1:ip!String,#App:1:hosts!StringArray"
    /// export TC_KVSTORE_HOST="localhost"
    /// export TC_KVSTORE_PORT="6379"
    /// ```
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// [`from_env`](Self::from_env) uses the process environment; tests pass
    /// a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(lookup(ENV_CONTEXT).unwrap_or_default());

        if let Some(raw) = lookup(ENV_OUT_VARIABLES) {
            config.output_variables = split_csv(&raw);
        }

        if let Some(base_url) = lookup(ENV_API_PATH) {
            let mut api = ApiBackendConfig::new(base_url);
            api.token = lookup(ENV_TOKEN);
            config.api = Some(api);
        }

        let host = lookup(ENV_KVSTORE_HOST);
        let port = lookup(ENV_KVSTORE_PORT);
        if host.is_some() || port.is_some() {
            let mut redis = RedisBackendConfig::default();
            if let Some(host) = host {
                redis.host = host;
            }
            if let Some(port) = port {
                redis.port = port.parse().map_err(|e| {
                    PlaybookError::Config(format!("{ENV_KVSTORE_PORT} is not a port: {e}"))
                })?;
            }
            config.redis = Some(redis);
        }

        Ok(config)
    }

    /// Sets the store behavior.
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Adds a requested output variable.
    pub fn with_output_variable(mut self, variable: impl Into<String>) -> Self {
        self.output_variables.push(variable.into());
        self
    }

    /// Builds the session's [`OutputRequest`] from
    /// [`output_variables`](Self::output_variables).
    pub fn output_request(&self) -> OutputRequest {
        OutputRequest::from_variables(&self.output_variables)
    }
}
