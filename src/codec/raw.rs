//! Untyped fallback codec.
//!
//! Raw records are stored and returned byte for byte. Custom variable types
//! go through this codec.

use serde_json::Value;

use super::{Payload, TypeCodec, TypedValue};
use crate::error::{PlaybookError, Result};
use crate::variable::VariableType;

/// Codec that stores bytes verbatim.
///
/// Text payloads are stored as their UTF-8 bytes and other JSON as its
/// serialized form.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl TypeCodec for RawCodec {
    fn variable_type(&self) -> VariableType {
        VariableType::Custom("Raw".to_string())
    }

    fn encode(&self, payload: Payload, _validate: bool) -> Result<Vec<u8>> {
        match payload {
            Payload::Bytes(bytes) => Ok(bytes),
            Payload::Json(Value::String(text)) => Ok(text.into_bytes()),
            other if other.is_null() => Err(PlaybookError::invalid(self.variable_type(), "value is null")),
            other => {
                let found = other.describe();
                let value = other.into_json().ok_or_else(|| {
                    PlaybookError::invalid(
                        self.variable_type(),
                        format!("cannot serialize {found} containing bytes"),
                    )
                })?;
                serde_json::to_vec(&value).map_err(Into::into)
            },
        }
    }

    fn decode(&self, raw: &[u8]) -> Result<Option<TypedValue>> {
        Ok(Some(TypedValue::Raw(raw.to_vec())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bytes_and_text_are_verbatim() {
        assert_eq!(RawCodec.encode(Payload::Bytes(vec![0xff, 0]), true).unwrap(), vec![0xff, 0]);
        assert_eq!(RawCodec.encode(Payload::from("plain"), true).unwrap(), b"plain");
    }

    #[test]
    fn json_is_serialized() {
        assert_eq!(
            RawCodec.encode(Payload::Json(json!({"a": [1]})), true).unwrap(),
            br#"{"a":[1]}"#
        );
    }

    #[test]
    fn decode_is_verbatim() {
        assert_eq!(
            RawCodec.decode(b"anything").unwrap(),
            Some(TypedValue::Raw(b"anything".to_vec()))
        );
    }
}
