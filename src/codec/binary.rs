//! `Binary` and `BinaryArray` codecs.
//!
//! Binary payloads are always base64-encoded in storage. A single value is
//! stored as bare base64 text; an array as a JSON array of base64 strings
//! (or `null` elements).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;

use super::{array_elements, parse_json, stored_elements, to_json_bytes, Payload, TypeCodec, TypedValue};
use crate::error::{PlaybookError, Result};
use crate::variable::VariableType;

/// Returns the base64 text of a stored single Binary record.
///
/// Records written as a JSON string (quoted) are unquoted; surrounding
/// whitespace is ignored.
pub fn stored_text(raw: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| PlaybookError::Serialization(format!("stored Binary is not UTF-8: {e}")))?
        .trim();
    if text.starts_with('"') {
        return serde_json::from_str::<String>(text).map_err(Into::into);
    }
    Ok(text.to_string())
}

/// Decodes base64 text.
pub(crate) fn decode_base64(text: &str, variable_type: &VariableType) -> Result<Vec<u8>> {
    STANDARD.decode(text.as_bytes()).map_err(|e| {
        PlaybookError::Serialization(format!("stored {variable_type} is not valid base64: {e}"))
    })
}

fn element_bytes(payload: Payload, variable_type: &VariableType, validate: bool) -> Result<Vec<u8>> {
    match payload {
        Payload::Bytes(bytes) => Ok(bytes),
        Payload::Json(Value::String(text)) if !validate => Ok(text.into_bytes()),
        other => Err(PlaybookError::invalid(
            variable_type.clone(),
            format!("expected bytes, found {}", other.describe()),
        )),
    }
}

/// Codec for `Binary` variables.
///
/// With validation enabled the payload must be [`Payload::Bytes`]; text is
/// rejected. Without validation, text is stored as its UTF-8 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl TypeCodec for BinaryCodec {
    fn variable_type(&self) -> VariableType {
        VariableType::Binary
    }

    fn encode(&self, payload: Payload, validate: bool) -> Result<Vec<u8>> {
        let bytes = element_bytes(payload, &VariableType::Binary, validate)?;
        Ok(STANDARD.encode(bytes).into_bytes())
    }

    fn decode(&self, raw: &[u8]) -> Result<Option<TypedValue>> {
        let text = stored_text(raw)?;
        if text == "null" {
            return Ok(None);
        }
        decode_base64(&text, &VariableType::Binary).map(|bytes| Some(TypedValue::Binary(bytes)))
    }
}

/// Codec for `BinaryArray` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryArrayCodec;

impl BinaryArrayCodec {
    /// Returns the stored base64 elements without decoding them.
    pub fn stored_elements(raw: &[u8]) -> Result<Option<Vec<Option<String>>>> {
        let value = parse_json(raw, &VariableType::BinaryArray)?;
        let Some(items) = stored_elements(value, &VariableType::BinaryArray)? else {
            return Ok(None);
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::Null => Ok(None),
                Value::String(text) => Ok(Some(text)),
                other => Err(PlaybookError::Serialization(format!(
                    "stored BinaryArray element is not a base64 string: {other}"
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

impl TypeCodec for BinaryArrayCodec {
    fn variable_type(&self) -> VariableType {
        VariableType::BinaryArray
    }

    fn encode(&self, payload: Payload, validate: bool) -> Result<Vec<u8>> {
        if payload.is_null() {
            return to_json_bytes(&Value::Null);
        }
        let items = array_elements(payload, &VariableType::BinaryArray)?
            .into_iter()
            .map(|element| {
                if element.is_null() {
                    return Ok(None);
                }
                element_bytes(element, &VariableType::BinaryArray, validate)
                    .map(|bytes| Some(STANDARD.encode(bytes)))
            })
            .collect::<Result<Vec<_>>>()?;
        to_json_bytes(&items)
    }

    fn decode(&self, raw: &[u8]) -> Result<Option<TypedValue>> {
        let Some(items) = Self::stored_elements(raw)? else {
            return Ok(None);
        };
        let items = items
            .into_iter()
            .map(|item| {
                item.map(|text| decode_base64(&text, &VariableType::BinaryArray))
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(TypedValue::BinaryArray(items)))
    }
}
