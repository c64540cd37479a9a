//! `KeyValue` and `KeyValueArray` codecs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{array_elements, parse_json, stored_elements, to_json_bytes, Payload, TypeCodec, TypedValue};
use crate::error::{PlaybookError, Result};
use crate::variable::VariableType;

/// A `{key, value}` record.
///
/// `value` may hold any JSON. Additional fields written by other producers
/// are preserved in `extra`.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tc_playbook::KeyValue;
///
/// let kv = KeyValue::new("ip", json!("1.2.3.4"));
/// assert_eq!(kv.to_json(), json!({"key": "ip", "value": "1.2.3.4"}));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Record key.
    pub key: String,
    /// Record value.
    pub value: Value,
    /// Fields beyond `key` and `value`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl KeyValue {
    /// Creates a record with no extra fields.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            extra: Map::new(),
        }
    }

    /// JSON object form of the record.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("key".to_string(), Value::String(self.key.clone()));
        map.insert("value".to_string(), self.value.clone());
        for (k, v) in &self.extra {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }
}

/// Structural check: an object carrying `key` and `value`.
pub(crate) fn validate_key_value(value: &Value, variable_type: &VariableType) -> Result<()> {
    let Value::Object(map) = value else {
        return Err(PlaybookError::invalid(
            variable_type.clone(),
            format!("expected an object, found {}", Payload::Json(value.clone()).describe()),
        ));
    };
    for field in ["key", "value"] {
        if !map.contains_key(field) {
            return Err(PlaybookError::invalid(
                variable_type.clone(),
                format!("missing field `{field}`"),
            ));
        }
    }
    if !map["key"].is_string() {
        return Err(PlaybookError::invalid(variable_type.clone(), "`key` must be text"));
    }
    Ok(())
}

fn element_json(payload: Payload, variable_type: &VariableType, validate: bool) -> Result<Value> {
    let found = payload.describe();
    let value = payload.into_json().ok_or_else(|| {
        PlaybookError::invalid(variable_type.clone(), format!("expected an object, found {found}"))
    })?;
    if validate {
        validate_key_value(&value, variable_type)?;
    }
    Ok(value)
}

fn decode_record(value: Value) -> Result<KeyValue> {
    serde_json::from_value(value)
        .map_err(|e| PlaybookError::Serialization(format!("stored KeyValue is malformed: {e}")))
}

/// Codec for `KeyValue` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueCodec;

impl TypeCodec for KeyValueCodec {
    fn variable_type(&self) -> VariableType {
        VariableType::KeyValue
    }

    fn encode(&self, payload: Payload, validate: bool) -> Result<Vec<u8>> {
        if payload.is_null() {
            return Err(PlaybookError::invalid(VariableType::KeyValue, "value is null"));
        }
        if validate && payload.clone().into_elements().is_some() {
            return Err(PlaybookError::invalid(
                VariableType::KeyValue,
                "expected an object, found array",
            ));
        }
        let value = element_json(payload, &VariableType::KeyValue, validate)?;
        to_json_bytes(&value)
    }

    fn decode(&self, raw: &[u8]) -> Result<Option<TypedValue>> {
        match parse_json(raw, &VariableType::KeyValue)? {
            Value::Null => Ok(None),
            value => decode_record(value).map(|kv| Some(TypedValue::KeyValue(kv))),
        }
    }
}

/// Codec for `KeyValueArray` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueArrayCodec;

impl TypeCodec for KeyValueArrayCodec {
    fn variable_type(&self) -> VariableType {
        VariableType::KeyValueArray
    }

    fn encode(&self, payload: Payload, validate: bool) -> Result<Vec<u8>> {
        if payload.is_null() {
            return to_json_bytes(&Value::Null);
        }
        let items = array_elements(payload, &VariableType::KeyValueArray)?
            .into_iter()
            .map(|element| element_json(element, &VariableType::KeyValueArray, validate))
            .collect::<Result<Vec<_>>>()?;
        to_json_bytes(&items)
    }

    fn decode(&self, raw: &[u8]) -> Result<Option<TypedValue>> {
        let value = parse_json(raw, &VariableType::KeyValueArray)?;
        let Some(items) = stored_elements(value, &VariableType::KeyValueArray)? else {
            return Ok(None);
        };
        items
            .into_iter()
            .map(decode_record)
            .collect::<Result<Vec<_>>>()
            .map(|items| Some(TypedValue::KeyValueArray(items)))
    }
}
