//! In-memory hashed backend.
//!
//! [`InMemoryHashBackend`] groups all keys of one context under a single
//! hash, the same shape the Redis backend uses, held in a `DashMap` of
//! `context -> HashMap<key, bytes>`. It supports delete and whole-context
//! reads. It is a dumb KV store with no Playbook logic, used for local runs
//! and tests.
//!
//! # Examples
//!
//! ```
//! use tc_playbook::store::memory::InMemoryHashBackend;
//! use tc_playbook::PlaybookStore;
//!
//! let store = PlaybookStore::new(InMemoryHashBackend::new(), "session-1");
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::store::backend::{DeleteOutcome, KeyValueBackend, StorageError, WriteAck};

/// Thread-safe in-memory backend with one hash per context.
#[derive(Debug, Default)]
pub struct InMemoryHashBackend {
    contexts: DashMap<String, HashMap<String, Vec<u8>>>,
}

impl InMemoryHashBackend {
    /// Creates an empty backend.
    ///
    /// # Examples
    ///
    /// ```
    /// use tc_playbook::store::memory::InMemoryHashBackend;
    ///
    /// let backend = InMemoryHashBackend::new();
    /// assert!(backend.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields stored in `context`.
    pub fn len(&self, context: &str) -> usize {
        self.contexts.get(context).map_or(0, |fields| fields.len())
    }

    /// Returns `true` when no context holds any field.
    pub fn is_empty(&self) -> bool {
        self.contexts.iter().all(|entry| entry.value().is_empty())
    }

    /// Drops every field of `context`, as when a session expires.
    pub fn clear_context(&self, context: &str) {
        self.contexts.remove(context);
    }
}

#[async_trait]
impl KeyValueBackend for InMemoryHashBackend {
    async fn create(&self, context: &str, key: &str, value: &[u8]) -> Result<WriteAck, StorageError> {
        let previous = self
            .contexts
            .entry(context.to_string())
            .or_default()
            .insert(key.to_string(), value.to_vec());
        Ok(if previous.is_some() {
            WriteAck::Updated
        } else {
            WriteAck::Created
        })
    }

    async fn read(&self, context: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .contexts
            .get(context)
            .and_then(|fields| fields.get(key).cloned()))
    }

    async fn delete(&self, context: &str, key: &str) -> Result<DeleteOutcome, StorageError> {
        let removed = self
            .contexts
            .get_mut(context)
            .and_then(|mut fields| fields.remove(key));
        Ok(if removed.is_some() {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }

    async fn read_all(&self, context: &str) -> Result<HashMap<String, Vec<u8>>, StorageError> {
        Ok(self
            .contexts
            .get(context)
            .map(|fields| fields.clone())
            .unwrap_or_default())
    }

    fn supports_delete(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_read() {
        let backend = InMemoryHashBackend::new();
        let ack = backend.create("ctx", "#App:1:a!String", b"\"x\"").await.unwrap();
        assert_eq!(ack, WriteAck::Created);
        let ack = backend.create("ctx", "#App:1:a!String", b"\"y\"").await.unwrap();
        assert_eq!(ack, WriteAck::Updated);
        assert_eq!(
            backend.read("ctx", "#App:1:a!String").await.unwrap(),
            Some(b"\"y\"".to_vec())
        );
        assert_eq!(backend.len("ctx"), 1);
    }

    #[tokio::test]
    async fn contexts_are_isolated() {
        let backend = InMemoryHashBackend::new();
        backend.create("one", "k", b"1").await.unwrap();
        assert_eq!(backend.read("two", "k").await.unwrap(), None);
        assert!(backend.read_all("two").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = InMemoryHashBackend::new();
        backend.create("ctx", "k", b"1").await.unwrap();
        assert_eq!(backend.delete("ctx", "k").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(backend.delete("ctx", "k").await.unwrap(), DeleteOutcome::NotFound);
        assert_eq!(backend.delete("nope", "k").await.unwrap(), DeleteOutcome::NotFound);
        assert!(backend.supports_delete());
    }

    #[tokio::test]
    async fn read_all_and_clear() {
        let backend = InMemoryHashBackend::new();
        backend.create("ctx", "a", b"1").await.unwrap();
        backend.create("ctx", "b", b"2").await.unwrap();
        let all = backend.read_all("ctx").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["b"], b"2".to_vec());
        backend.clear_context("ctx");
        assert!(backend.is_empty());
    }
}
