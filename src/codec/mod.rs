//! Per-type encode/decode rules for Playbook variables.
//!
//! # Architecture
//!
//! Writes accept an untyped [`Payload`], the shape Apps hand to the store
//! (JSON values, raw bytes, or lists of either). Each [`VariableType`] has
//! exactly one [`TypeCodec`] which validates and coerces the payload into
//! its wire envelope, and decodes the envelope back into a [`TypedValue`].
//! [`codec_for`] selects the codec with a closed `match` on the type.
//!
//! # Wire envelopes
//!
//! | Type | Stored bytes |
//! |------|--------------|
//! | `String` | JSON string |
//! | `KeyValue` / `TCEntity` | JSON object |
//! | `Binary` | base64 text (not JSON-quoted) |
//! | `*Array` | JSON array of the element envelopes (binary elements as base64 strings) |
//! | custom types | bytes verbatim |
//!
//! A null Array payload is stored as JSON `null` and decodes to `None`.

pub mod binary;
pub mod key_value;
pub mod raw;
pub mod string;
pub mod tc_entity;

use serde_json::Value;

pub use binary::{BinaryArrayCodec, BinaryCodec};
pub use key_value::{KeyValue, KeyValueArrayCodec, KeyValueCodec};
pub use raw::RawCodec;
pub use string::{coerce_string, StringArrayCodec, StringCodec};
pub use tc_entity::{TcEntity, TcEntityArrayCodec, TcEntityCodec};

use crate::error::{PlaybookError, Result};
use crate::variable::VariableType;

/// Encode/decode rules for one variable type.
///
/// Codecs are stateless; the `validate` flag on [`encode`](Self::encode)
/// switches structural validation on or off per call.
pub trait TypeCodec: Send + Sync {
    /// The type this codec handles.
    fn variable_type(&self) -> VariableType;

    /// Validates and serializes `payload` into its wire envelope.
    ///
    /// # Errors
    ///
    /// - [`PlaybookError::InvalidData`] when `validate` is set and the
    ///   payload violates the type's structural contract, or when the
    ///   payload cannot be represented at all (bytes where JSON is needed).
    /// - [`PlaybookError::Serialization`] when JSON encoding fails.
    fn encode(&self, payload: Payload, validate: bool) -> Result<Vec<u8>>;

    /// Deserializes a stored envelope.
    ///
    /// Returns `Ok(None)` for a stored JSON `null`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybookError::Serialization`] when the stored bytes are not
    /// a valid envelope for this type.
    fn decode(&self, raw: &[u8]) -> Result<Option<TypedValue>>;
}

/// Returns the codec for `variable_type`.
///
/// Enhanced entity types use the TCEntity codecs; custom types use
/// [`RawCodec`].
///
/// # Examples
///
/// ```
/// use tc_playbook::codec::{codec_for, Payload};
/// use tc_playbook::VariableType;
///
/// let codec = codec_for(&VariableType::String);
/// let bytes = codec.encode(Payload::from(true), true).unwrap();
/// assert_eq!(bytes, br#""true""#);
/// ```
pub fn codec_for(variable_type: &VariableType) -> &'static dyn TypeCodec {
    match variable_type {
        VariableType::Binary => &BinaryCodec,
        VariableType::BinaryArray => &BinaryArrayCodec,
        VariableType::KeyValue => &KeyValueCodec,
        VariableType::KeyValueArray => &KeyValueArrayCodec,
        VariableType::String => &StringCodec,
        VariableType::StringArray => &StringArrayCodec,
        VariableType::TcEntity | VariableType::TcEnhancedEntity => &TcEntityCodec,
        VariableType::TcEntityArray | VariableType::TcEnhancedEntityArray => &TcEntityArrayCodec,
        VariableType::Custom(_) => &RawCodec,
    }
}

/// Checks that a variable of type `actual` may go through the codec path
/// for `expected`.
///
/// Types are compared by codec kind, so a `TCEnhancedEntity` variable is
/// accepted on the TCEntity path.
///
/// # Errors
///
/// Returns [`PlaybookError::TypeMismatch`] otherwise.
pub fn check_type(variable: &str, actual: &VariableType, expected: &VariableType) -> Result<()> {
    if actual.codec_kind() == expected.codec_kind() {
        Ok(())
    } else {
        Err(PlaybookError::TypeMismatch {
            variable: variable.to_string(),
            expected: expected.clone(),
            actual: actual.clone(),
        })
    }
}

/// An untyped value handed to the store for writing.
///
/// `Payload` mirrors what an App naturally produces: JSON values, byte
/// buffers, and lists mixing either. Codecs decide which shapes they accept.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tc_playbook::codec::Payload;
///
/// assert_eq!(Payload::from("text"), Payload::Json(json!("text")));
/// assert_eq!(Payload::from(b"raw".to_vec()), Payload::Bytes(b"raw".to_vec()));
/// assert!(Payload::Json(json!(null)).is_null());
///
/// let list = Payload::list(["a", "b"]);
/// assert_eq!(list, Payload::List(vec![Payload::from("a"), Payload::from("b")]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No value.
    Null,
    /// A byte buffer.
    Bytes(Vec<u8>),
    /// Any JSON value.
    Json(Value),
    /// A list of payloads.
    List(Vec<Payload>),
}

impl Payload {
    /// Builds a [`List`](Self::List) from any iterator of convertible items.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Payload>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Returns `true` for [`Null`](Self::Null) and JSON `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Json(Value::Null))
    }

    /// Splits an array-shaped payload into its elements.
    ///
    /// Returns `None` for non-array payloads.
    pub fn into_elements(self) -> Option<Vec<Payload>> {
        match self {
            Self::List(items) => Some(items),
            Self::Json(Value::Array(items)) => Some(items.into_iter().map(Self::Json).collect()),
            _ => None,
        }
    }

    /// A short name for the payload's shape, used in error messages.
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Null | Self::Json(Value::Null) => "null",
            Self::Bytes(_) => "bytes",
            Self::List(_) | Self::Json(Value::Array(_)) => "array",
            Self::Json(Value::Bool(_)) => "boolean",
            Self::Json(Value::Number(_)) => "number",
            Self::Json(Value::String(_)) => "text",
            Self::Json(Value::Object(_)) => "object",
        }
    }

    /// Converts the payload to JSON when it contains no bytes.
    pub(crate) fn into_json(self) -> Option<Value> {
        match self {
            Self::Null => Some(Value::Null),
            Self::Json(value) => Some(value),
            Self::Bytes(_) => None,
            Self::List(items) => items
                .into_iter()
                .map(Self::into_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Json(Value::String(value.to_string()))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Self::Json(Value::Bool(value))
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<Payload>> for Payload {
    fn from(items: Vec<Payload>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<&str>> for Payload {
    fn from(items: Vec<&str>) -> Self {
        Self::list(items)
    }
}

impl From<Vec<String>> for Payload {
    fn from(items: Vec<String>) -> Self {
        Self::list(items)
    }
}

impl From<Vec<Vec<u8>>> for Payload {
    fn from(items: Vec<Vec<u8>>) -> Self {
        Self::list(items)
    }
}

impl From<KeyValue> for Payload {
    fn from(kv: KeyValue) -> Self {
        Self::Json(kv.to_json())
    }
}

impl From<Vec<KeyValue>> for Payload {
    fn from(items: Vec<KeyValue>) -> Self {
        Self::list(items)
    }
}

impl From<TcEntity> for Payload {
    fn from(entity: TcEntity) -> Self {
        Self::Json(entity.to_json())
    }
}

impl From<Vec<TcEntity>> for Payload {
    fn from(items: Vec<TcEntity>) -> Self {
        Self::list(items)
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<TypedValue> for Payload {
    fn from(value: TypedValue) -> Self {
        match value {
            TypedValue::Binary(bytes) | TypedValue::Raw(bytes) => Self::Bytes(bytes),
            TypedValue::BinaryArray(items) => Self::list(items),
            TypedValue::KeyValue(kv) => kv.into(),
            TypedValue::KeyValueArray(items) => items.into(),
            TypedValue::String(s) => s.into(),
            TypedValue::StringArray(items) => Self::list(items),
            TypedValue::TcEntity(entity) => entity.into(),
            TypedValue::TcEntityArray(items) => items.into(),
        }
    }
}

/// A decoded Playbook value.
///
/// Each variant corresponds to one codec. Enhanced entity types decode to
/// the TCEntity variants; custom types decode to [`Raw`](Self::Raw).
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// Decoded binary bytes.
    Binary(Vec<u8>),
    /// Decoded binary elements; `None` for null elements.
    BinaryArray(Vec<Option<Vec<u8>>>),
    /// A key/value record.
    KeyValue(KeyValue),
    /// Key/value records.
    KeyValueArray(Vec<KeyValue>),
    /// Text.
    String(String),
    /// Text elements; `None` for null elements.
    StringArray(Vec<Option<String>>),
    /// An entity record.
    TcEntity(TcEntity),
    /// Entity records.
    TcEntityArray(Vec<TcEntity>),
    /// Stored bytes, uninterpreted.
    Raw(Vec<u8>),
}

impl TypedValue {
    /// Returns `true` for the binary variants.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_) | Self::BinaryArray(_))
    }

    /// Returns the text of a [`String`](Self::String) value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the record of a [`KeyValue`](Self::KeyValue) value.
    pub fn as_key_value(&self) -> Option<&KeyValue> {
        match self {
            Self::KeyValue(kv) => Some(kv),
            _ => None,
        }
    }

    /// Returns the record of a [`TcEntity`](Self::TcEntity) value.
    pub fn as_tc_entity(&self) -> Option<&TcEntity> {
        match self {
            Self::TcEntity(entity) => Some(entity),
            _ => None,
        }
    }

    /// JSON view of the value.
    ///
    /// Binary values have no JSON form and return `None`. Raw values are
    /// returned as text when they are valid UTF-8.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Binary(_) | Self::BinaryArray(_) => None,
            Self::Raw(bytes) => std::str::from_utf8(bytes)
                .ok()
                .map(|s| Value::String(s.to_string())),
            Self::KeyValue(kv) => Some(kv.to_json()),
            Self::KeyValueArray(items) => {
                Some(Value::Array(items.iter().map(KeyValue::to_json).collect()))
            },
            Self::String(s) => Some(Value::String(s.clone())),
            Self::StringArray(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| item.clone().map_or(Value::Null, Value::String))
                    .collect(),
            )),
            Self::TcEntity(entity) => Some(entity.to_json()),
            Self::TcEntityArray(items) => {
                Some(Value::Array(items.iter().map(TcEntity::to_json).collect()))
            },
        }
    }
}

/// Parses a stored JSON envelope.
pub(crate) fn parse_json(raw: &[u8], variable_type: &VariableType) -> Result<Value> {
    serde_json::from_slice(raw).map_err(|e| {
        PlaybookError::Serialization(format!("stored {variable_type} is not valid JSON: {e}"))
    })
}

/// Serializes a JSON envelope.
pub(crate) fn to_json_bytes<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(Into::into)
}

/// Splits an array payload, or reports that the Single/Array class is wrong.
pub(crate) fn array_elements(payload: Payload, variable_type: &VariableType) -> Result<Vec<Payload>> {
    let found = payload.describe();
    payload
        .into_elements()
        .ok_or_else(|| PlaybookError::invalid(variable_type.clone(), format!("expected an array, found {found}")))
}

/// Splits a stored JSON array envelope.
pub(crate) fn stored_elements(value: Value, variable_type: &VariableType) -> Result<Option<Vec<Value>>> {
    match value {
        Value::Null => Ok(None),
        Value::Array(items) => Ok(Some(items)),
        other => Err(PlaybookError::Serialization(format!(
            "stored {variable_type} is not a JSON array: {other}"
        ))),
    }
}
