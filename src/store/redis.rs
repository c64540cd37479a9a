//! Redis hashed backend for Playbook variables.
//!
//! [`RedisHashBackend`] implements [`KeyValueBackend`] using one Redis hash
//! per context. The four operations map directly to hash commands:
//!
//! | Operation | Command |
//! |-----------|---------|
//! | `create` | `HSET {context} {key} {value}` |
//! | `read` | `HGET {context} {key}` |
//! | `delete` | `HDEL {context} {key}` |
//! | `read_all` | `HGETALL {context}` |
//!
//! Each field's value is the serialized envelope produced by the codec
//! layer (JSON, or base64 text for Binary). The backend never interprets
//! it.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tc_playbook::store::redis::RedisHashBackend;
//! use tc_playbook::PlaybookStore;
//!
//! # async fn example() {
//! let backend = RedisHashBackend::new("redis://127.0.0.1:6379").await.unwrap();
//! let store = PlaybookStore::new(backend, "session-context");
//! # }
//! ```

use std::collections::HashMap;

use ::redis::aio::MultiplexedConnection;
use ::redis::AsyncCommands;
use async_trait::async_trait;

use crate::config::RedisBackendConfig;
use crate::store::backend::{DeleteOutcome, KeyValueBackend, StorageError, WriteAck};

/// Redis backend storing each context as a hash.
///
/// # Connection Model
///
/// `RedisHashBackend` holds a [`MultiplexedConnection`], which is cheap to
/// clone; all clones share one TCP connection. Each method clones it.
#[derive(Clone)]
pub struct RedisHashBackend {
    conn: MultiplexedConnection,
}

impl std::fmt::Debug for RedisHashBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisHashBackend").finish_non_exhaustive()
    }
}

impl RedisHashBackend {
    /// Creates a backend by connecting to Redis at the given URL.
    ///
    /// The URL format is `redis://[:<password>@]<host>:<port>[/<db>]`.
    /// Fails fast if the connection cannot be established.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the client cannot be created or
    /// the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self, StorageError> {
        let client = ::redis::Client::open(url)
            .map_err(|e| StorageError::backend(format!("failed to create Redis client: {e}"), e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StorageError::backend(format!("failed to connect to Redis: {e}"), e))?;
        tracing::debug!(url = url, "connected to Redis key-value store");
        Ok(Self { conn })
    }

    /// Connects using a [`RedisBackendConfig`].
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub async fn from_config(config: &RedisBackendConfig) -> Result<Self, StorageError> {
        Self::new(&config.url()).await
    }

    /// Creates a backend with a pre-built multiplexed connection.
    pub fn with_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

/// Maps a Redis error to a [`StorageError::Backend`].
fn map_redis_error(err: ::redis::RedisError, context: &str, key: &str) -> StorageError {
    StorageError::backend(format!("Redis error for {context}/{key}: {err}"), err)
}

#[async_trait]
impl KeyValueBackend for RedisHashBackend {
    async fn create(&self, context: &str, key: &str, value: &[u8]) -> Result<WriteAck, StorageError> {
        let mut conn = self.conn.clone();
        let added: i64 = conn
            .hset(context, key, value)
            .await
            .map_err(|e| map_redis_error(e, context, key))?;
        Ok(if added > 0 {
            WriteAck::Created
        } else {
            WriteAck::Updated
        })
    }

    async fn read(&self, context: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut conn = self.conn.clone();
        conn.hget(context, key)
            .await
            .map_err(|e| map_redis_error(e, context, key))
    }

    async fn delete(&self, context: &str, key: &str) -> Result<DeleteOutcome, StorageError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .hdel(context, key)
            .await
            .map_err(|e| map_redis_error(e, context, key))?;
        Ok(if removed > 0 {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }

    async fn read_all(&self, context: &str) -> Result<HashMap<String, Vec<u8>>, StorageError> {
        let mut conn = self.conn.clone();
        conn.hgetall(context)
            .await
            .map_err(|e| map_redis_error(e, context, "*"))
    }

    fn supports_delete(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Integration tests -- Redis backend contract tests
// ---------------------------------------------------------------------------

/// Integration tests for [`RedisHashBackend`] against a real Redis instance.
///
/// These tests require a running Redis (default `redis://127.0.0.1:6379`,
/// override with `REDIS_URL`). Run with:
///
/// ```bash
/// cargo test --features redis-tests -- redis_ --test-threads=1
/// ```
///
/// Each test writes to its own context hash, so tests do not interfere.
#[cfg(all(test, feature = "redis-tests"))]
mod integration_tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT: AtomicUsize = AtomicUsize::new(0);

    async fn test_backend() -> (RedisHashBackend, String) {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let backend = RedisHashBackend::new(&url)
            .await
            .expect("Redis connection failed -- is Redis running?");
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let context = format!(
            "test-{}-{nanos}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::SeqCst)
        );
        (backend, context)
    }

    #[tokio::test]
    async fn redis_create_then_read() {
        let (backend, ctx) = test_backend().await;
        let ack = backend.create(&ctx, "#App:1:ip!String", b"\"1.2.3.4\"").await.unwrap();
        assert_eq!(ack, WriteAck::Created);
        let ack = backend.create(&ctx, "#App:1:ip!String", b"\"5.6.7.8\"").await.unwrap();
        assert_eq!(ack, WriteAck::Updated);
        assert_eq!(
            backend.read(&ctx, "#App:1:ip!String").await.unwrap(),
            Some(b"\"5.6.7.8\"".to_vec())
        );
        backend.delete(&ctx, "#App:1:ip!String").await.unwrap();
    }

    #[tokio::test]
    async fn redis_read_missing_is_none() {
        let (backend, ctx) = test_backend().await;
        assert_eq!(backend.read(&ctx, "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn redis_delete_is_idempotent() {
        let (backend, ctx) = test_backend().await;
        backend.create(&ctx, "k", b"v").await.unwrap();
        assert_eq!(backend.delete(&ctx, "k").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(backend.delete(&ctx, "k").await.unwrap(), DeleteOutcome::NotFound);
    }

    #[tokio::test]
    async fn redis_read_all_returns_context_hash() {
        let (backend, ctx) = test_backend().await;
        backend.create(&ctx, "a", b"1").await.unwrap();
        backend.create(&ctx, "b", b"2").await.unwrap();
        let all = backend.read_all(&ctx).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["b"], b"2".to_vec());
        backend.delete(&ctx, "a").await.unwrap();
        backend.delete(&ctx, "b").await.unwrap();
    }
}
