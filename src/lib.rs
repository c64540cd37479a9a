//! Typed Playbook variable store for threat-intelligence Apps.
//!
//! Playbook Apps pass data to each other through *Playbook variables*:
//! typed values stored in a session-scoped key-value store and addressed by
//! a canonical identifier such as `#App:1234:threat.ip!String`. This crate
//! implements that protocol.
//!
//! # Overview
//!
//! - Variable strings are parsed into a [`Variable`] carrying its
//!   [`VariableType`].
//! - Each type has one codec that validates writes and decodes reads
//!   (JSON envelopes, base64 for binary data).
//! - String and KeyValue reads resolve variables embedded in their text,
//!   exactly one level deep.
//! - Writes go through an output gate: only variables a downstream App
//!   requested are written.
//! - Storage is a pluggable [`KeyValueBackend`]: in memory, Redis (feature
//!   `redis`) or the platform HTTP API (feature `http-client`).
//!
//! # Example
//!
//! ```
//! use tc_playbook::store::memory::InMemoryHashBackend;
//! use tc_playbook::{OutputRequest, PlaybookStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = PlaybookStore::new(InMemoryHashBackend::new(), "ctx")
//!     .with_output_request(OutputRequest::from_csv("#App:1:ip!String,#App:1:msg!String"));
//!
//! store.create().string("#App:1:ip!String", "1.2.3.4").await.unwrap();
//! store.create().string("msg", "ip is #App:1:ip!String").await.unwrap();
//!
//! let msg = store.read().string("#App:1:msg!String").await.unwrap();
//! assert_eq!(msg.as_deref(), Some("ip is 1.2.3.4"));
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`variable`] - Variable grammar and types
//! - [`codec`] - Per-type encode/decode
//! - [`store`] - Backend trait and implementations
//! - [`resolver`] - Embedded variable resolution
//! - [`output`] - Output request and accumulator
//! - [`playbook`] - The [`PlaybookStore`] facade
//! - [`config`] - TOML and environment configuration
//! - [`error`] - Error types

pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod output;
pub mod playbook;
pub mod resolver;
pub mod store;
pub mod variable;

// Re-exports for ergonomic access
pub use codec::{KeyValue, Payload, TcEntity, TypedValue};
pub use config::{PlaybookConfig, StoreConfig};
pub use error::{PlaybookError, Result};
pub use output::{OutputAccumulator, OutputRequest};
pub use playbook::PlaybookStore;
pub use resolver::ExternalResolver;
pub use store::{DeleteOutcome, KeyValueBackend, StorageError, WriteAck};
pub use variable::{Variable, VariableType};
