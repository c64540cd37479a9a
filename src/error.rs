//! Error types for Playbook variable operations.
//!
//! [`PlaybookError`] covers the errors that are surfaced to callers
//! immediately: structural validation failures, type mismatches between a
//! variable's declared type and the codec invoked against it, serialization
//! failures, and unresolvable variable keys.
//!
//! Backend failures are a different category. They are represented by
//! [`StorageError`](crate::store::StorageError), logged at the facade
//! boundary, and absorbed into a `None` result. They never appear here.

use thiserror::Error;

use crate::variable::VariableType;

/// Result alias for Playbook operations that can raise hard errors.
pub type Result<T> = std::result::Result<T, PlaybookError>;

/// Errors that indicate a caller or programmer defect.
///
/// # Examples
///
/// ```
/// use tc_playbook::{PlaybookError, VariableType};
///
/// let err = PlaybookError::InvalidData {
///     variable_type: VariableType::KeyValue,
///     reason: "missing field `value`".to_string(),
/// };
/// assert!(err.to_string().starts_with("invalid data for KeyValue"));
/// ```
#[derive(Debug, Error)]
pub enum PlaybookError {
    /// The payload does not satisfy the structural contract of its type.
    #[error("invalid data for {variable_type}: {reason}")]
    InvalidData {
        /// The type whose contract was violated.
        variable_type: VariableType,
        /// What was wrong with the payload.
        reason: String,
    },

    /// The type suffix on a variable disagrees with the codec path invoked.
    #[error("type mismatch for {variable}: expected {expected}, found {actual}")]
    TypeMismatch {
        /// The variable (or literal) the call was made against.
        variable: String,
        /// The type the invoked codec handles.
        expected: VariableType,
        /// The type carried by the variable.
        actual: VariableType,
    },

    /// The payload could not be encoded to its wire envelope.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The key cannot be turned into a concrete Playbook variable.
    #[error("invalid variable {key}: {reason}")]
    InvalidVariable {
        /// The key as supplied by the caller.
        key: String,
        /// Why it could not be resolved.
        reason: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PlaybookError {
    /// Shorthand for an [`InvalidData`](Self::InvalidData) error.
    pub(crate) fn invalid(variable_type: VariableType, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            variable_type,
            reason: reason.into(),
        }
    }

    /// Returns `true` for structural validation failures.
    pub fn is_invalid_data(&self) -> bool {
        matches!(self, Self::InvalidData { .. })
    }

    /// Returns `true` for type mismatch failures.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }
}

impl From<serde_json::Error> for PlaybookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for PlaybookError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("TOML parse error: {err}"))
    }
}

impl From<std::io::Error> for PlaybookError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = PlaybookError::invalid(VariableType::TcEntity, "missing field `id`");
        assert_eq!(
            err.to_string(),
            "invalid data for TCEntity: missing field `id`"
        );

        let err = PlaybookError::TypeMismatch {
            variable: "#App:1:e!TCEntity".to_string(),
            expected: VariableType::String,
            actual: VariableType::TcEntity,
        };
        assert_eq!(
            err.to_string(),
            "type mismatch for #App:1:e!TCEntity: expected String, found TCEntity"
        );
    }

    #[test]
    fn error_predicates() {
        assert!(PlaybookError::invalid(VariableType::Binary, "text").is_invalid_data());
        assert!(!PlaybookError::Serialization("x".to_string()).is_type_mismatch());
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PlaybookError = json_err.into();
        assert!(matches!(err, PlaybookError::Serialization(_)));
    }
}
