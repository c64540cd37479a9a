//! Backend trait and implementations.
//!
//! # Architecture
//!
//! Storage has two layers:
//!
//! 1. **[`PlaybookStore<B>`](crate::playbook::PlaybookStore)** -- All
//!    Playbook logic (type checks, codecs, embedded resolution, output
//!    gating, failure absorption).
//!
//! 2. **[`KeyValueBackend`]** -- Dumb `(context, key) -> bytes` trait that
//!    backends implement. No Playbook logic.
//!
//! Backend selection depends on the execution mode of the hosting App and
//! is left to the caller: construct a backend and pass it to
//! `PlaybookStore::new`.
//!
//! # Backends
//!
//! - [`InMemoryHashBackend`](crate::store::memory::InMemoryHashBackend) --
//!   One hash per context held in memory. Supports delete and bulk read.
//! - [`RedisHashBackend`](crate::store::redis::RedisHashBackend) -- One
//!   Redis hash per context. Available behind the `redis` feature flag.
//! - [`ApiBackend`](crate::store::api::ApiBackend) -- The platform's HTTP
//!   key-value API. Create/read only. Available behind the `http-client`
//!   feature flag (on by default).

#[cfg(feature = "http-client")]
pub mod api;
pub mod backend;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use backend::{DeleteOutcome, KeyValueBackend, StorageError, WriteAck};
