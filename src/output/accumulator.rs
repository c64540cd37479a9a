//! Deferred output writes.
//!
//! Apps that build an output across many iterations (one indicator per
//! loop pass) add to an [`OutputAccumulator`] and write everything once at
//! the end with [`flush`](OutputAccumulator::flush).

use indexmap::IndexMap;
use serde_json::Value;

use crate::codec::Payload;
use crate::error::Result;
use crate::playbook::PlaybookStore;
use crate::store::KeyValueBackend;
use crate::variable::{key_type_index, VariableType};

#[derive(Debug, Clone, PartialEq)]
struct Pending {
    key: String,
    variable_type: VariableType,
    value: Payload,
}

/// Flattens a payload into list items; null contributes nothing.
fn into_items(payload: Payload) -> Vec<Payload> {
    match payload {
        p if p.is_null() => Vec::new(),
        Payload::List(items) => items,
        Payload::Json(Value::Array(items)) => items.into_iter().map(Payload::Json).collect(),
        scalar => vec![scalar],
    }
}

/// Accumulates output values keyed by `key-Type`.
///
/// # Lifecycle
///
/// An entry is created by the first [`add`](Self::add) for its key and
/// type, mutated by later adds, and drained by [`flush`](Self::flush),
/// which leaves the accumulator empty.
///
/// # Examples
///
/// ```
/// use tc_playbook::{OutputAccumulator, Payload, VariableType};
///
/// let mut out = OutputAccumulator::new();
/// out.add("hosts", Payload::list(["a"]), VariableType::StringArray, true);
/// out.add("hosts", "b", VariableType::StringArray, true);
/// assert_eq!(
///     out.get("hosts", &VariableType::StringArray),
///     Some(&Payload::list(["a", "b"]))
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct OutputAccumulator {
    entries: IndexMap<String, Pending>,
}

impl OutputAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value for `key` (bare key or full variable) and `variable_type`.
    ///
    /// For Array types with `append` set, a list value extends the pending
    /// list and a scalar value is pushed onto it; a null value only makes
    /// sure the entry exists. Otherwise the pending value is replaced.
    pub fn add(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Payload>,
        variable_type: VariableType,
        append: bool,
    ) {
        let key = key.into();
        let value = value.into();
        let index = key_type_index(&key, &variable_type);

        if !(append && variable_type.is_array()) {
            self.entries.insert(
                index,
                Pending {
                    key,
                    variable_type,
                    value,
                },
            );
            return;
        }

        let entry = self.entries.entry(index).or_insert_with(|| Pending {
            key,
            variable_type,
            value: Payload::List(Vec::new()),
        });
        let mut items = into_items(std::mem::replace(&mut entry.value, Payload::Null));
        items.extend(into_items(value));
        entry.value = Payload::List(items);
    }

    /// The pending value for `key` and `variable_type`.
    pub fn get(&self, key: &str, variable_type: &VariableType) -> Option<&Payload> {
        self.entries
            .get(&key_type_index(key, variable_type))
            .map(|pending| &pending.value)
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes every pending entry through `store`, one gated write each,
    /// in insertion order, and empties the accumulator.
    ///
    /// Returns the number of entries the backend accepted. Gated-out
    /// entries and absorbed backend failures are not counted.
    ///
    /// # Errors
    ///
    /// All entries are attempted; the first hard error (invalid data, type
    /// mismatch) is returned after the drain completes.
    pub async fn flush<B: KeyValueBackend>(&mut self, store: &PlaybookStore<B>) -> Result<usize> {
        let mut written = 0;
        let mut first_error = None;
        for (_, pending) in self.entries.drain(..) {
            match store
                .create()
                .any(&pending.key, pending.value, Some(pending.variable_type))
                .await
            {
                Ok(Some(_)) => written += 1,
                Ok(None) => {},
                Err(e) => {
                    tracing::warn!(key = %pending.key, error = %e, "failed to flush output");
                    first_error.get_or_insert(e);
                },
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn append_extends_lists_and_pushes_scalars() {
        let mut out = OutputAccumulator::new();
        out.add("k", Payload::list(["a"]), VariableType::StringArray, true);
        out.add("k", json!(["b", "c"]), VariableType::StringArray, true);
        out.add("k", "d", VariableType::StringArray, true);
        assert_eq!(
            out.get("k", &VariableType::StringArray),
            Some(&Payload::List(vec![
                Payload::from("a"),
                Payload::Json(json!("b")),
                Payload::Json(json!("c")),
                Payload::from("d"),
            ]))
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn replace_without_append() {
        let mut out = OutputAccumulator::new();
        out.add("k", Payload::list(["a"]), VariableType::StringArray, true);
        out.add("k", Payload::list(["z"]), VariableType::StringArray, false);
        assert_eq!(out.get("k", &VariableType::StringArray), Some(&Payload::list(["z"])));
    }

    #[test]
    fn scalar_types_always_replace() {
        let mut out = OutputAccumulator::new();
        out.add("k", "first", VariableType::String, true);
        out.add("k", "second", VariableType::String, true);
        assert_eq!(out.get("k", &VariableType::String), Some(&Payload::from("second")));
    }

    #[test]
    fn null_append_creates_empty_entry() {
        let mut out = OutputAccumulator::new();
        out.add("k", Payload::Null, VariableType::BinaryArray, true);
        assert_eq!(out.get("k", &VariableType::BinaryArray), Some(&Payload::List(Vec::new())));
        out.add("k", b"x".to_vec(), VariableType::BinaryArray, true);
        out.add("k", Payload::Null, VariableType::BinaryArray, true);
        assert_eq!(
            out.get("k", &VariableType::BinaryArray),
            Some(&Payload::List(vec![Payload::Bytes(b"x".to_vec())]))
        );
    }

    #[test]
    fn same_key_different_types_are_separate() {
        let mut out = OutputAccumulator::new();
        out.add("ip", "1.2.3.4", VariableType::String, false);
        out.add("ip", Payload::list(["1.2.3.4"]), VariableType::StringArray, true);
        assert_eq!(out.len(), 2);
        assert!(out.get("ip", &VariableType::Binary).is_none());
    }
}
