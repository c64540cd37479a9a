//! The Playbook store facade.
//!
//! [`PlaybookStore`] composes the variable parser, the codecs, embedded
//! resolution and output gating on top of any [`KeyValueBackend`]. The
//! public surface is three views:
//!
//! ```rust,no_run
//! # use tc_playbook::{PlaybookStore, OutputRequest};
//! # use tc_playbook::store::memory::InMemoryHashBackend;
//! # async fn example() -> tc_playbook::Result<()> {
//! let store = PlaybookStore::new(InMemoryHashBackend::new(), "ctx")
//!     .with_output_request(OutputRequest::from_csv("#App:1:ip!String"));
//!
//! store.create().string("#App:1:ip!String", "1.2.3.4").await?;
//! let ip = store.read().string("#App:1:ip!String").await?;
//! store.delete().variable("#App:1:ip!String").await;
//! # Ok(())
//! # }
//! ```
//!
//! # Failure handling
//!
//! Caller defects (invalid data, type mismatches, unusable keys) are
//! returned as [`PlaybookError`](crate::PlaybookError). Backend failures
//! and unreadable stored records are logged and reported as `None`, so a
//! single failed round-trip never aborts an App run.

pub mod create;
pub mod delete;
pub mod read;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use create::Create;
pub use delete::Delete;
pub use read::Read;

use crate::codec::{codec_for, TypedValue};
use crate::config::{PlaybookConfig, StoreConfig};
use crate::output::OutputRequest;
use crate::resolver::{EmbeddedResolver, ExternalResolver, VariableLookup};
use crate::store::{KeyValueBackend, WriteAck};
use crate::variable::Variable;

/// Typed Playbook variable store over a [`KeyValueBackend`].
///
/// One store serves one session context. Construct it once per App run and
/// pass it where variables are read or written.
///
/// # Type Parameters
///
/// * `B` - A [`KeyValueBackend`] implementation (in-memory, Redis, HTTP API)
pub struct PlaybookStore<B: KeyValueBackend> {
    backend: B,
    context: String,
    output: Arc<OutputRequest>,
    config: StoreConfig,
    external: Option<Arc<dyn ExternalResolver>>,
}

impl<B: KeyValueBackend + std::fmt::Debug> std::fmt::Debug for PlaybookStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybookStore")
            .field("backend", &self.backend)
            .field("context", &self.context)
            .field("output", &self.output)
            .field("config", &self.config)
            .field("external", &self.external.is_some())
            .finish()
    }
}

impl<B: KeyValueBackend> PlaybookStore<B> {
    /// Creates a store for `context` with default configuration and an
    /// empty output request.
    ///
    /// With the default configuration writes are gated, so nothing is
    /// written until an [`OutputRequest`] is attached or gating is turned
    /// off.
    pub fn new(backend: B, context: impl Into<String>) -> Self {
        Self {
            backend,
            context: context.into(),
            output: Arc::new(OutputRequest::new()),
            config: StoreConfig::default(),
            external: None,
        }
    }

    /// Creates a store from a loaded [`PlaybookConfig`].
    pub fn from_config(backend: B, config: &PlaybookConfig) -> Self {
        Self::new(backend, config.context.clone())
            .with_config(config.store.clone())
            .with_output_request(config.output_request())
    }

    /// Sets the output request.
    pub fn with_output_request(mut self, output: impl Into<Arc<OutputRequest>>) -> Self {
        self.output = output.into();
        self
    }

    /// Sets the store configuration.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the resolver for external `&{Provider:Lookup:id}` references.
    pub fn with_external_resolver(mut self, resolver: impl ExternalResolver + 'static) -> Self {
        self.external = Some(Arc::new(resolver));
        self
    }

    /// Session context.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The session's output request.
    pub fn output_request(&self) -> &OutputRequest {
        &self.output
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Write operations.
    pub fn create(&self) -> Create<'_, B> {
        Create::new(self)
    }

    /// Read operations.
    pub fn read(&self) -> Read<'_, B> {
        Read::new(self)
    }

    /// Delete operations.
    pub fn delete(&self) -> Delete<'_, B> {
        Delete::new(self)
    }

    // ---- Backend round-trips (failures absorbed) ----

    pub(crate) async fn put(&self, variable: &Variable, bytes: &[u8]) -> Option<WriteAck> {
        let key = variable.to_string();
        match self.backend.create(&self.context, &key, bytes).await {
            Ok(ack) => {
                tracing::debug!(variable = %key, context = %self.context, ?ack, "wrote variable");
                Some(ack)
            },
            Err(e) => {
                tracing::warn!(variable = %key, context = %self.context, error = %e, "failed to write variable");
                None
            },
        }
    }

    pub(crate) async fn fetch(&self, key: &str) -> Option<Vec<u8>> {
        match self.backend.read(&self.context, key).await {
            Ok(raw) => {
                tracing::debug!(variable = %key, context = %self.context, found = raw.is_some(), "read variable");
                raw
            },
            Err(e) => {
                tracing::warn!(variable = %key, context = %self.context, error = %e, "failed to read variable");
                None
            },
        }
    }

    pub(crate) async fn fetch_all(&self) -> Option<HashMap<String, Vec<u8>>> {
        match self.backend.read_all(&self.context).await {
            Ok(all) => Some(all),
            Err(e) => {
                tracing::warn!(context = %self.context, error = %e, "failed to read context");
                None
            },
        }
    }

    /// Reads and decodes `variable` with its own codec. Malformed records
    /// are logged and reported as `None`.
    pub(crate) async fn fetch_typed(&self, variable: &Variable) -> Option<TypedValue> {
        let raw = self.fetch(&variable.to_string()).await?;
        match codec_for(variable.variable_type()).decode(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(variable = %variable, error = %e, "stored record does not decode");
                None
            },
        }
    }

    pub(crate) fn embedded(&self) -> EmbeddedResolver<'_> {
        EmbeddedResolver::new(self, self.config.max_embedded_scan_bytes)
            .with_external(self.external.as_deref())
    }
}

#[async_trait]
impl<B: KeyValueBackend> VariableLookup for PlaybookStore<B> {
    async fn lookup(&self, variable: &Variable) -> Option<TypedValue> {
        self.fetch_typed(variable).await
    }
}
