//! Low-level key-value backend trait and supporting types.
//!
//! The [`KeyValueBackend`] trait is the contract every Playbook store
//! engine implements: [`create`](KeyValueBackend::create) and
//! [`read`](KeyValueBackend::read), plus two optional capabilities,
//! [`delete`](KeyValueBackend::delete) and
//! [`read_all`](KeyValueBackend::read_all), which default to
//! [`StorageError::Unsupported`].
//!
//! Type handling (validation, coercion, base64, embedded resolution, output
//! gating) does **not** belong here. Backends are dumb stores of opaque
//! bytes; the Playbook logic lives in
//! [`PlaybookStore`](crate::playbook::PlaybookStore).
//!
//! # Addressing
//!
//! Every record is addressed by a `(context, key)` pair. The context is the
//! session namespace of one App invocation; the key is the literal variable
//! string (`#App:1:ip!String`). Backends must store and return keys
//! verbatim.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

/// Acknowledgment of a successful write.
///
/// # Examples
///
/// ```
/// use tc_playbook::store::WriteAck;
///
/// assert!(WriteAck::Created.is_new());
/// assert!(!WriteAck::Updated.is_new());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAck {
    /// The field did not exist before.
    Created,
    /// An existing field was overwritten.
    Updated,
    /// The backend accepted the write without saying which.
    Accepted,
}

impl WriteAck {
    /// Returns `true` when the backend reports a newly created field.
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Created)
    }
}

/// Outcome of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The field existed and was removed.
    Deleted,
    /// The field did not exist; nothing changed.
    NotFound,
    /// The backend has no delete operation; nothing changed.
    Unsupported,
}

/// Errors that can occur during raw storage operations.
///
/// These never reach Playbook callers: the facade logs them and returns
/// `None`.
///
/// # Examples
///
/// ```
/// use tc_playbook::store::StorageError;
///
/// let err = StorageError::Unsupported { operation: "delete" };
/// assert_eq!(err.to_string(), "operation not supported by backend: delete");
/// ```
#[derive(Debug)]
pub enum StorageError {
    /// The backend does not implement the requested capability.
    Unsupported {
        /// The operation that was requested.
        operation: &'static str,
    },

    /// The backend answered with something it should not have.
    InvalidResponse {
        /// The key involved.
        key: String,
        /// Human-readable description.
        message: String,
    },

    /// An I/O or backend-specific error occurred (connection refused,
    /// timeout, server error).
    Backend {
        /// Human-readable description of the error.
        message: String,
        /// The underlying error, if available. Accessible via
        /// [`std::error::Error::source()`].
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StorageError {
    /// Builds a [`Backend`](Self::Backend) error from an underlying cause.
    pub fn backend<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { operation } => {
                write!(f, "operation not supported by backend: {operation}")
            },
            Self::InvalidResponse { key, message } => {
                write!(f, "invalid backend response for key {key}: {message}")
            },
            Self::Backend { message, .. } => write!(f, "backend error: {message}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend {
                source: Some(src), ..
            } => Some(src.as_ref()),
            _ => None,
        }
    }
}

/// Key-value backend for Playbook variables.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a store can be shared behind an
/// `Arc`. No locking is required by the Playbook layer itself.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Stores `value` under `key` in `context` (create or overwrite).
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] on I/O or backend-specific failures.
    async fn create(&self, context: &str, key: &str, value: &[u8]) -> Result<WriteAck, StorageError>;

    /// Reads the value stored under `key` in `context`.
    ///
    /// Returns `Ok(None)` when nothing is stored.
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] on I/O or backend-specific failures.
    async fn read(&self, context: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Deletes `key` from `context`.
    ///
    /// Deleting a missing key is not an error and reports
    /// [`DeleteOutcome::NotFound`].
    ///
    /// # Errors
    ///
    /// [`StorageError::Unsupported`] when the backend cannot delete (the
    /// default), [`StorageError::Backend`] on failures.
    async fn delete(&self, _context: &str, _key: &str) -> Result<DeleteOutcome, StorageError> {
        Err(StorageError::Unsupported { operation: "delete" })
    }

    /// Reads every field stored in `context`.
    ///
    /// # Errors
    ///
    /// [`StorageError::Unsupported`] when the backend cannot enumerate a
    /// context (the default), [`StorageError::Backend`] on failures.
    async fn read_all(&self, _context: &str) -> Result<HashMap<String, Vec<u8>>, StorageError> {
        Err(StorageError::Unsupported { operation: "read_all" })
    }

    /// Returns `true` when [`delete`](Self::delete) is implemented.
    fn supports_delete(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ReadOnly;

    #[async_trait]
    impl KeyValueBackend for ReadOnly {
        async fn create(&self, _: &str, _: &str, _: &[u8]) -> Result<WriteAck, StorageError> {
            Ok(WriteAck::Accepted)
        }

        async fn read(&self, _: &str, _: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(None)
        }
    }

    #[test]
    fn storage_error_display_backend() {
        let err = StorageError::Backend {
            message: "connection timeout".to_string(),
            source: None,
        };
        assert_eq!(err.to_string(), "backend error: connection timeout");
    }

    #[test]
    fn storage_error_display_invalid_response() {
        let err = StorageError::InvalidResponse {
            key: "#App:1:x!String".to_string(),
            message: "status 500".to_string(),
        };
        assert!(err.to_string().contains("#App:1:x!String"));
        assert!(err.to_string().contains("status 500"));
    }

    #[test]
    fn storage_error_source_backend_with_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = StorageError::backend("redis failed", inner);
        let source = std::error::Error::source(&err);
        assert!(source.is_some());
        assert!(source.unwrap().to_string().contains("timed out"));
    }

    #[test]
    fn storage_error_source_unsupported_returns_none() {
        let err = StorageError::Unsupported { operation: "delete" };
        assert!(std::error::Error::source(&err).is_none());
    }

    #[tokio::test]
    async fn optional_capabilities_default_to_unsupported() {
        let backend = ReadOnly;
        assert!(!backend.supports_delete());
        assert!(matches!(
            backend.delete("ctx", "k").await,
            Err(StorageError::Unsupported { operation: "delete" })
        ));
        assert!(matches!(
            backend.read_all("ctx").await,
            Err(StorageError::Unsupported { operation: "read_all" })
        ));
    }
}
