//! Read operations.

use std::collections::HashMap;

use serde_json::Value;

use crate::codec::{binary, check_type, BinaryArrayCodec, KeyValue, TcEntity, TypedValue};
use crate::constants::{BINARY_TOKEN, NULL_TOKEN};
use crate::error::Result;
use crate::playbook::PlaybookStore;
use crate::store::KeyValueBackend;
use crate::variable::{self, Variable, VariableType};

/// Read view of a [`PlaybookStore`].
///
/// `key` may be a variable or a literal. A literal is treated as an
/// already-resolved String: [`string`](Self::string) and
/// [`any`](Self::any) return it (with embedded variables resolved), the
/// other typed readers report a type mismatch.
///
/// String and KeyValue results have embedded variables resolved unless
/// turned off with [`resolve_embedded`](Self::resolve_embedded).
#[derive(Debug)]
pub struct Read<'a, B: KeyValueBackend> {
    store: &'a PlaybookStore<B>,
    resolve_embedded: bool,
}

impl<'a, B: KeyValueBackend> Read<'a, B> {
    pub(crate) fn new(store: &'a PlaybookStore<B>) -> Self {
        Self {
            store,
            resolve_embedded: store.config.resolve_embedded,
        }
    }

    /// Turns embedded resolution on or off for this view.
    pub fn resolve_embedded(mut self, resolve: bool) -> Self {
        self.resolve_embedded = resolve;
        self
    }

    /// Reads a variable of any type, dispatching on its type suffix.
    ///
    /// A literal comes back as [`TypedValue::String`].
    pub async fn any(&self, key: &str) -> Result<Option<TypedValue>> {
        let Some(target) = variable::parse(key) else {
            return Ok(Some(TypedValue::String(self.embed_text(key).await)));
        };
        let value = match self.store.fetch_typed(&target).await {
            Some(TypedValue::String(text)) => TypedValue::String(self.embed_text(&text).await),
            Some(TypedValue::KeyValue(kv)) => TypedValue::KeyValue(self.embed_key_value(kv).await),
            Some(TypedValue::KeyValueArray(items)) => {
                TypedValue::KeyValueArray(self.embed_key_values(items).await)
            },
            Some(other) => other,
            None => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Reads `Binary` bytes.
    ///
    /// With `b64decode` off, returns the stored base64 text as bytes.
    ///
    /// # Errors
    ///
    /// [`PlaybookError::TypeMismatch`](crate::PlaybookError::TypeMismatch)
    /// unless `key` is a `Binary` variable.
    pub async fn binary(&self, key: &str, b64decode: bool) -> Result<Option<Vec<u8>>> {
        let Some(target) = self.target(key, &VariableType::Binary)? else {
            return Ok(None);
        };
        if b64decode {
            return Ok(match self.store.fetch_typed(&target).await {
                Some(TypedValue::Binary(bytes)) => Some(bytes),
                _ => None,
            });
        }
        let Some(raw) = self.store.fetch(&target.to_string()).await else {
            return Ok(None);
        };
        Ok(match binary::stored_text(&raw) {
            Ok(text) if text == "null" => None,
            Ok(text) => Some(text.into_bytes()),
            Err(e) => {
                tracing::warn!(variable = %target, error = %e, "stored record does not decode");
                None
            },
        })
    }

    /// Reads `Binary` bytes and decodes them as UTF-8 text.
    pub async fn binary_text(&self, key: &str) -> Result<Option<String>> {
        Ok(self.binary(key, true).await?.and_then(|bytes| {
            String::from_utf8(bytes)
                .map_err(|e| tracing::warn!(variable = key, error = %e, "binary value is not UTF-8"))
                .ok()
        }))
    }

    /// Reads `BinaryArray` elements.
    ///
    /// With `b64decode` off, each element is the stored base64 text.
    pub async fn binary_array(&self, key: &str, b64decode: bool) -> Result<Option<Vec<Option<Vec<u8>>>>> {
        let Some(target) = self.target(key, &VariableType::BinaryArray)? else {
            return Ok(None);
        };
        if b64decode {
            return Ok(match self.store.fetch_typed(&target).await {
                Some(TypedValue::BinaryArray(items)) => Some(items),
                _ => None,
            });
        }
        let Some(raw) = self.store.fetch(&target.to_string()).await else {
            return Ok(None);
        };
        Ok(match BinaryArrayCodec::stored_elements(&raw) {
            Ok(items) => items.map(|items| {
                items
                    .into_iter()
                    .map(|item| item.map(String::into_bytes))
                    .collect()
            }),
            Err(e) => {
                tracing::warn!(variable = %target, error = %e, "stored record does not decode");
                None
            },
        })
    }

    /// Reads a `KeyValue` record.
    pub async fn key_value(&self, key: &str) -> Result<Option<KeyValue>> {
        match self.typed(key, &VariableType::KeyValue).await? {
            Some(TypedValue::KeyValue(kv)) => Ok(Some(self.embed_key_value(kv).await)),
            _ => Ok(None),
        }
    }

    /// Reads `KeyValueArray` records.
    pub async fn key_value_array(&self, key: &str) -> Result<Option<Vec<KeyValue>>> {
        match self.typed(key, &VariableType::KeyValueArray).await? {
            Some(TypedValue::KeyValueArray(items)) => Ok(Some(self.embed_key_values(items).await)),
            _ => Ok(None),
        }
    }

    /// Reads a `String` variable, or returns a literal as is.
    pub async fn string(&self, key: &str) -> Result<Option<String>> {
        if !variable::is_variable(key) {
            return Ok(Some(self.embed_text(key).await));
        }
        match self.typed(key, &VariableType::String).await? {
            Some(TypedValue::String(text)) => Ok(Some(self.embed_text(&text).await)),
            _ => Ok(None),
        }
    }

    /// Reads `StringArray` elements.
    pub async fn string_array(&self, key: &str) -> Result<Option<Vec<Option<String>>>> {
        match self.typed(key, &VariableType::StringArray).await? {
            Some(TypedValue::StringArray(items)) => Ok(Some(items)),
            _ => Ok(None),
        }
    }

    /// Reads a `TCEntity` (or `TCEnhancedEntity`) record.
    pub async fn tc_entity(&self, key: &str) -> Result<Option<TcEntity>> {
        match self.typed(key, &VariableType::TcEntity).await? {
            Some(TypedValue::TcEntity(entity)) => Ok(Some(entity)),
            _ => Ok(None),
        }
    }

    /// Reads `TCEntityArray` (or `TCEnhancedEntityArray`) records.
    pub async fn tc_entity_array(&self, key: &str) -> Result<Option<Vec<TcEntity>>> {
        match self.typed(key, &VariableType::TcEntityArray).await? {
            Some(TypedValue::TcEntityArray(items)) => Ok(Some(items)),
            _ => Ok(None),
        }
    }

    /// Reads the stored bytes of `key` verbatim.
    pub async fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.store.fetch(key).await
    }

    /// Every stored field of the session context.
    ///
    /// `None` when the backend has no bulk read or the read failed.
    pub async fn context_snapshot(&self) -> Option<HashMap<String, Vec<u8>>> {
        self.store.fetch_all().await
    }

    // ---- Helpers ----

    /// Parses `key` and checks it against `expected`. Literals count as
    /// `String`; `Ok(None)` means a literal on the String path.
    fn target(&self, key: &str, expected: &VariableType) -> Result<Option<Variable>> {
        let parsed = variable::parse(key);
        let actual = parsed
            .as_ref()
            .map_or(VariableType::String, |v| v.variable_type().clone());
        check_type(key, &actual, expected)?;
        Ok(parsed)
    }

    async fn typed(&self, key: &str, expected: &VariableType) -> Result<Option<TypedValue>> {
        match self.target(key, expected)? {
            Some(target) => Ok(self.store.fetch_typed(&target).await),
            None => Ok(None),
        }
    }

    async fn embed_text(&self, text: &str) -> String {
        if !self.resolve_embedded {
            return text.to_string();
        }
        self.store.embedded().resolve_text(text).await
    }

    async fn embed_key_value(&self, mut kv: KeyValue) -> KeyValue {
        if !self.resolve_embedded {
            return kv;
        }
        let replacement = match &kv.value {
            Value::String(text) => Some(match variable::parse(text) {
                Some(whole) => self.whole_variable(&whole).await,
                None => Value::String(self.store.embedded().resolve_text(text).await),
            }),
            _ => None,
        };
        if let Some(value) = replacement {
            kv.value = value;
        }
        kv
    }

    async fn embed_key_values(&self, items: Vec<KeyValue>) -> Vec<KeyValue> {
        let mut resolved = Vec::with_capacity(items.len());
        for kv in items {
            resolved.push(self.embed_key_value(kv).await);
        }
        resolved
    }

    /// Typed JSON of a variable that makes up a whole KeyValue value.
    async fn whole_variable(&self, target: &Variable) -> Value {
        if target.variable_type().single() == VariableType::Binary {
            return Value::String(BINARY_TOKEN.to_string());
        }
        self.store
            .fetch_typed(target)
            .await
            .and_then(|value| value.to_json())
            .unwrap_or_else(|| Value::String(NULL_TOKEN.to_string()))
    }
}
