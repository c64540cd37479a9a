//! `TCEntity` and `TCEntityArray` codecs.
//!
//! The legacy `TCEnhancedEntity` types use these codecs too; their extra
//! fields land in [`TcEntity::extra`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{array_elements, parse_json, stored_elements, to_json_bytes, Payload, TypeCodec, TypedValue};
use crate::error::{PlaybookError, Result};
use crate::variable::VariableType;

/// The platform's generic threat-intel entity, `{id, value, type}`.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tc_playbook::TcEntity;
///
/// let entity = TcEntity::new("1001", "1.2.3.4", "Address");
/// assert_eq!(
///     entity.to_json(),
///     json!({"id": "1001", "value": "1.2.3.4", "type": "Address"})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcEntity {
    /// Entity id. Numeric ids are read as their decimal text.
    #[serde(deserialize_with = "id_text")]
    pub id: String,
    /// Entity summary value.
    pub value: String,
    /// Entity type, e.g. `Address` or `Host`.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Fields beyond `id`, `value` and `type`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn id_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "entity id must be text or a number, found {other}"
        ))),
    }
}

impl TcEntity {
    /// Creates an entity with no extra fields.
    pub fn new(
        id: impl Into<String>,
        value: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            entity_type: entity_type.into(),
            extra: Map::new(),
        }
    }

    /// JSON object form of the entity.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert("value".to_string(), Value::String(self.value.clone()));
        map.insert("type".to_string(), Value::String(self.entity_type.clone()));
        for (k, v) in &self.extra {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }
}

/// An object carrying `id`, `value` and `type` that decodes as a [`TcEntity`].
fn validate_entity(value: &Value, variable_type: &VariableType) -> Result<()> {
    let Value::Object(map) = value else {
        return Err(PlaybookError::invalid(
            variable_type.clone(),
            format!("expected an object, found {}", Payload::Json(value.clone()).describe()),
        ));
    };
    for field in ["id", "value", "type"] {
        if !map.contains_key(field) {
            return Err(PlaybookError::invalid(
                variable_type.clone(),
                format!("missing field `{field}`"),
            ));
        }
    }
    serde_json::from_value::<TcEntity>(value.clone())
        .map(|_| ())
        .map_err(|e| PlaybookError::invalid(variable_type.clone(), e.to_string()))
}

fn element_json(payload: Payload, variable_type: &VariableType, validate: bool) -> Result<Value> {
    let found = payload.describe();
    let value = payload.into_json().ok_or_else(|| {
        PlaybookError::invalid(variable_type.clone(), format!("expected an object, found {found}"))
    })?;
    if validate {
        validate_entity(&value, variable_type)?;
    }
    Ok(value)
}

fn decode_entity(value: Value) -> Result<TcEntity> {
    serde_json::from_value(value)
        .map_err(|e| PlaybookError::Serialization(format!("stored TCEntity is malformed: {e}")))
}

/// Codec for `TCEntity` (and `TCEnhancedEntity`) variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcEntityCodec;

impl TypeCodec for TcEntityCodec {
    fn variable_type(&self) -> VariableType {
        VariableType::TcEntity
    }

    fn encode(&self, payload: Payload, validate: bool) -> Result<Vec<u8>> {
        if payload.is_null() {
            return Err(PlaybookError::invalid(VariableType::TcEntity, "value is null"));
        }
        let value = element_json(payload, &VariableType::TcEntity, validate)?;
        to_json_bytes(&value)
    }

    fn decode(&self, raw: &[u8]) -> Result<Option<TypedValue>> {
        match parse_json(raw, &VariableType::TcEntity)? {
            Value::Null => Ok(None),
            value => decode_entity(value).map(|entity| Some(TypedValue::TcEntity(entity))),
        }
    }
}

/// Codec for `TCEntityArray` (and `TCEnhancedEntityArray`) variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcEntityArrayCodec;

impl TypeCodec for TcEntityArrayCodec {
    fn variable_type(&self) -> VariableType {
        VariableType::TcEntityArray
    }

    fn encode(&self, payload: Payload, validate: bool) -> Result<Vec<u8>> {
        if payload.is_null() {
            return to_json_bytes(&Value::Null);
        }
        let items = array_elements(payload, &VariableType::TcEntityArray)?
            .into_iter()
            .map(|element| element_json(element, &VariableType::TcEntityArray, validate))
            .collect::<Result<Vec<_>>>()?;
        to_json_bytes(&items)
    }

    fn decode(&self, raw: &[u8]) -> Result<Option<TypedValue>> {
        let value = parse_json(raw, &VariableType::TcEntityArray)?;
        let Some(items) = stored_elements(value, &VariableType::TcEntityArray)? else {
            return Ok(None);
        };
        items
            .into_iter()
            .map(decode_entity)
            .collect::<Result<Vec<_>>>()
            .map(|items| Some(TypedValue::TcEntityArray(items)))
    }
}
