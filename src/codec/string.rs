//! `String` and `StringArray` codecs.
//!
//! Scalars are coerced to text before storage: booleans become `"true"` /
//! `"false"` and numbers their decimal form. The same rule applies when an
//! embedded variable is substituted into text.

use serde_json::Value;

use super::{array_elements, parse_json, stored_elements, to_json_bytes, Payload, TypeCodec, TypedValue};
use crate::error::{PlaybookError, Result};
use crate::variable::VariableType;

/// Coerces a JSON scalar to text.
///
/// Returns `None` for null, arrays and objects.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tc_playbook::codec::coerce_string;
///
/// assert_eq!(coerce_string(&json!(true)), Some("true".to_string()));
/// assert_eq!(coerce_string(&json!(42)), Some("42".to_string()));
/// assert_eq!(coerce_string(&json!(1.5)), Some("1.5".to_string()));
/// assert_eq!(coerce_string(&json!({"a": 1})), None);
/// ```
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn utf8(bytes: Vec<u8>, variable_type: VariableType) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| PlaybookError::invalid(variable_type, format!("bytes are not UTF-8: {e}")))
}

/// Codec for `String` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl StringCodec {
    fn to_text(payload: Payload, validate: bool) -> Result<String> {
        match payload {
            Payload::Bytes(bytes) => utf8(bytes, VariableType::String),
            Payload::Json(value) => match coerce_string(&value) {
                Some(text) => Ok(text),
                None if value.is_null() => Err(PlaybookError::invalid(VariableType::String, "value is null")),
                None if validate => Err(PlaybookError::invalid(
                    VariableType::String,
                    format!("expected text, found {}", Payload::Json(value).describe()),
                )),
                None => Ok(value.to_string()),
            },
            other => Err(PlaybookError::invalid(
                VariableType::String,
                format!("expected text, found {}", other.describe()),
            )),
        }
    }
}

impl TypeCodec for StringCodec {
    fn variable_type(&self) -> VariableType {
        VariableType::String
    }

    fn encode(&self, payload: Payload, validate: bool) -> Result<Vec<u8>> {
        let text = Self::to_text(payload, validate)?;
        to_json_bytes(&text)
    }

    fn decode(&self, raw: &[u8]) -> Result<Option<TypedValue>> {
        // Older producers wrote bare text rather than a JSON string.
        let Ok(value) = serde_json::from_slice::<Value>(raw) else {
            let text = String::from_utf8(raw.to_vec()).map_err(|e| {
                PlaybookError::Serialization(format!("stored String is not UTF-8: {e}"))
            })?;
            return Ok(Some(TypedValue::String(text)));
        };
        Ok(match value {
            Value::Null => None,
            other => Some(TypedValue::String(
                coerce_string(&other).unwrap_or_else(|| other.to_string()),
            )),
        })
    }
}

/// Codec for `StringArray` variables.
///
/// Elements are coerced rather than validated: null stays null, scalars
/// follow [`coerce_string`], and nested structures are stored as their JSON
/// text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringArrayCodec;

impl StringArrayCodec {
    fn coerce_element(element: Payload) -> Result<Option<String>> {
        match element {
            Payload::Null => Ok(None),
            Payload::Bytes(bytes) => utf8(bytes, VariableType::StringArray).map(Some),
            Payload::Json(Value::Null) => Ok(None),
            Payload::Json(value) => Ok(Some(coerce_string(&value).unwrap_or_else(|| value.to_string()))),
            list @ Payload::List(_) => list
                .into_json()
                .map(|value| Some(value.to_string()))
                .ok_or_else(|| {
                    PlaybookError::invalid(VariableType::StringArray, "nested list contains bytes")
                }),
        }
    }
}

impl TypeCodec for StringArrayCodec {
    fn variable_type(&self) -> VariableType {
        VariableType::StringArray
    }

    fn encode(&self, payload: Payload, _validate: bool) -> Result<Vec<u8>> {
        if payload.is_null() {
            return to_json_bytes(&Value::Null);
        }
        let items = array_elements(payload, &VariableType::StringArray)?
            .into_iter()
            .map(Self::coerce_element)
            .collect::<Result<Vec<_>>>()?;
        to_json_bytes(&items)
    }

    fn decode(&self, raw: &[u8]) -> Result<Option<TypedValue>> {
        let value = parse_json(raw, &VariableType::StringArray)?;
        let Some(items) = stored_elements(value, &VariableType::StringArray)? else {
            return Ok(None);
        };
        let items = items
            .into_iter()
            .map(|item| match item {
                Value::Null => None,
                other => Some(coerce_string(&other).unwrap_or_else(|| other.to_string())),
            })
            .collect();
        Ok(Some(TypedValue::StringArray(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn encode_coerces_scalars() {
        let codec = StringCodec;
        assert_eq!(codec.encode(Payload::from("hi"), true).unwrap(), br#""hi""#);
        assert_eq!(codec.encode(Payload::from(false), true).unwrap(), br#""false""#);
        assert_eq!(codec.encode(Payload::from(7_i64), true).unwrap(), br#""7""#);
        assert_eq!(codec.encode(Payload::from(2.5), true).unwrap(), br#""2.5""#);
    }

    #[test]
    fn encode_rejects_structures_when_validating() {
        let err = StringCodec
            .encode(Payload::Json(json!({"a": 1})), true)
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid data for String"));
        let bytes = StringCodec.encode(Payload::Json(json!({"a": 1})), false).unwrap();
        assert_eq!(bytes, br#""{\"a\":1}""#);
    }

    #[test]
    fn encode_rejects_null() {
        assert!(StringCodec.encode(Payload::Null, false).unwrap_err().is_invalid_data());
    }

    #[test]
    fn encode_rejects_array_class() {
        let err = StringCodec.encode(Payload::list(["a"]), true).unwrap_err();
        assert!(err.is_invalid_data());
    }

    #[test]
    fn decode_json_and_bare_text() {
        assert_eq!(
            StringCodec.decode(br#""1.2.3.4""#).unwrap(),
            Some(TypedValue::String("1.2.3.4".to_string()))
        );
        assert_eq!(
            StringCodec.decode(b"bare text").unwrap(),
            Some(TypedValue::String("bare text".to_string()))
        );
        assert_eq!(StringCodec.decode(b"null").unwrap(), None);
        assert_eq!(
            StringCodec.decode(b"12").unwrap(),
            Some(TypedValue::String("12".to_string()))
        );
    }

    #[test]
    fn array_encode_coerces_each_element() {
        let payload = Payload::Json(json!(["a", true, 3, null, {"k": "v"}]));
        let bytes = StringArrayCodec.encode(payload, true).unwrap();
        let stored: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(stored, json!(["a", "true", "3", null, "{\"k\":\"v\"}"]));
    }

    #[test]
    fn array_encode_null_is_stored_as_null() {
        assert_eq!(StringArrayCodec.encode(Payload::Null, true).unwrap(), b"null");
        assert_eq!(StringArrayCodec.decode(b"null").unwrap(), None);
    }

    #[test]
    fn array_encode_rejects_single_class() {
        let err = StringArrayCodec.encode(Payload::from("a"), true).unwrap_err();
        assert!(err.to_string().contains("expected an array"));
    }

    #[test]
    fn array_decode() {
        assert_eq!(
            StringArrayCodec.decode(br#"["a",null]"#).unwrap(),
            Some(TypedValue::StringArray(vec![Some("a".to_string()), None]))
        );
        assert!(StringArrayCodec.decode(br#""a""#).is_err());
    }
}
