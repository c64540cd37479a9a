//! Write operations.

use crate::codec::{check_type, codec_for, KeyValue, Payload, RawCodec, TcEntity, TypeCodec};
use crate::error::{PlaybookError, Result};
use crate::playbook::PlaybookStore;
use crate::store::{KeyValueBackend, WriteAck};
use crate::variable::{self, Variable, VariableType};

/// Write view of a [`PlaybookStore`].
///
/// Every method accepts either a full variable (`#App:1:ip!String`) or a
/// bare key (`ip`). A bare key is resolved against the
/// [`OutputRequest`](crate::OutputRequest) by key and the method's type.
///
/// Methods return `Ok(None)` when the write was skipped by the output gate
/// or the backend failed, and `Ok(Some(ack))` when the backend accepted it.
#[derive(Debug)]
pub struct Create<'a, B: KeyValueBackend> {
    store: &'a PlaybookStore<B>,
}

impl<'a, B: KeyValueBackend> Create<'a, B> {
    pub(crate) fn new(store: &'a PlaybookStore<B>) -> Self {
        Self { store }
    }

    /// Writes `value` with the type taken from `variable_type`, or from the
    /// key's type suffix when `None`.
    ///
    /// Custom types are stored raw.
    ///
    /// # Errors
    ///
    /// - [`PlaybookError::InvalidVariable`] for a bare key without a type.
    /// - [`PlaybookError::TypeMismatch`] when `variable_type` disagrees with
    ///   the key's suffix.
    /// - [`PlaybookError::InvalidData`] when validation rejects the value.
    pub async fn any(
        &self,
        key: &str,
        value: impl Into<Payload>,
        variable_type: Option<VariableType>,
    ) -> Result<Option<WriteAck>> {
        let variable_type = match variable_type {
            Some(t) => t,
            None => variable::parse(key)
                .map(|v| v.variable_type().clone())
                .ok_or_else(|| PlaybookError::InvalidVariable {
                    key: key.to_string(),
                    reason: "a type is required for a key that is not a variable".to_string(),
                })?,
        };
        self.typed(key, value.into(), variable_type).await
    }

    /// Writes a `Binary` variable.
    pub async fn binary(&self, key: &str, value: impl Into<Payload>) -> Result<Option<WriteAck>> {
        self.typed(key, value.into(), VariableType::Binary).await
    }

    /// Writes a `BinaryArray` variable.
    pub async fn binary_array(&self, key: &str, value: impl Into<Payload>) -> Result<Option<WriteAck>> {
        self.typed(key, value.into(), VariableType::BinaryArray).await
    }

    /// Writes a `KeyValue` variable.
    pub async fn key_value(&self, key: &str, value: impl Into<Payload>) -> Result<Option<WriteAck>> {
        self.typed(key, value.into(), VariableType::KeyValue).await
    }

    /// Writes a `KeyValueArray` variable.
    pub async fn key_value_array(&self, key: &str, value: impl Into<Payload>) -> Result<Option<WriteAck>> {
        self.typed(key, value.into(), VariableType::KeyValueArray).await
    }

    /// Writes a `String` variable. Booleans and numbers are coerced to text.
    pub async fn string(&self, key: &str, value: impl Into<Payload>) -> Result<Option<WriteAck>> {
        self.typed(key, value.into(), VariableType::String).await
    }

    /// Writes a `StringArray` variable.
    pub async fn string_array(&self, key: &str, value: impl Into<Payload>) -> Result<Option<WriteAck>> {
        self.typed(key, value.into(), VariableType::StringArray).await
    }

    /// Writes a `TCEntity` variable.
    pub async fn tc_entity(&self, key: &str, value: impl Into<Payload>) -> Result<Option<WriteAck>> {
        self.typed(key, value.into(), VariableType::TcEntity).await
    }

    /// Writes a `TCEntityArray` variable.
    pub async fn tc_entity_array(&self, key: &str, value: impl Into<Payload>) -> Result<Option<WriteAck>> {
        self.typed(key, value.into(), VariableType::TcEntityArray).await
    }

    /// Writes bytes verbatim under a full variable of any type.
    ///
    /// No type check and no envelope: the bytes are stored as given.
    ///
    /// # Errors
    ///
    /// [`PlaybookError::InvalidVariable`] when `key` is not a variable.
    pub async fn raw(&self, key: &str, value: impl Into<Payload>) -> Result<Option<WriteAck>> {
        let target = variable::parse(key).ok_or_else(|| PlaybookError::InvalidVariable {
            key: key.to_string(),
            reason: "raw writes need a full variable".to_string(),
        })?;
        let value = value.into();
        if !self.passes_gate(&target, &value) {
            return Ok(None);
        }
        let bytes = RawCodec.encode(value, self.store.config.validate)?;
        Ok(self.store.put(&target, &bytes).await)
    }

    /// Convenience for [`key_value`](Self::key_value) with a typed record.
    pub async fn key_value_record(&self, key: &str, record: KeyValue) -> Result<Option<WriteAck>> {
        self.key_value(key, record).await
    }

    /// Convenience for [`tc_entity`](Self::tc_entity) with a typed record.
    pub async fn tc_entity_record(&self, key: &str, entity: TcEntity) -> Result<Option<WriteAck>> {
        self.tc_entity(key, entity).await
    }

    async fn typed(&self, key: &str, value: Payload, expected: VariableType) -> Result<Option<WriteAck>> {
        let Some(target) = self.target(key, &expected)? else {
            return Ok(None);
        };
        if !self.passes_gate(&target, &value) {
            return Ok(None);
        }
        let bytes = codec_for(target.variable_type()).encode(value, self.store.config.validate)?;
        Ok(self.store.put(&target, &bytes).await)
    }

    /// Resolves `key` to the variable to write.
    ///
    /// `Ok(None)` means a bare key nobody requested.
    fn target(&self, key: &str, expected: &VariableType) -> Result<Option<Variable>> {
        if let Some(parsed) = variable::parse(key) {
            check_type(key, parsed.variable_type(), expected)?;
            return Ok(Some(parsed));
        }
        if !self.store.config.when_requested {
            return Err(PlaybookError::InvalidVariable {
                key: key.to_string(),
                reason: "a bare key needs output gating to find its variable".to_string(),
            });
        }
        match self.store.output.variable(key, expected) {
            Some(found) => Ok(Some(found.clone())),
            None => {
                tracing::debug!(key = key, variable_type = %expected, "variable was not requested by downstream app");
                Ok(None)
            },
        }
    }

    fn passes_gate(&self, target: &Variable, value: &Payload) -> bool {
        if self.store.config.when_requested && !self.store.output.contains(target) {
            tracing::debug!(variable = %target, "variable was not requested by downstream app");
            return false;
        }
        if value.is_null() && !target.variable_type().is_array() {
            tracing::debug!(variable = %target, "null value for single variable not written");
            return false;
        }
        true
    }
}
