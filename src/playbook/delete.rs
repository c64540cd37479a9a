//! Delete operations.

use crate::playbook::PlaybookStore;
use crate::store::{DeleteOutcome, KeyValueBackend, StorageError};

/// Delete view of a [`PlaybookStore`].
#[derive(Debug)]
pub struct Delete<'a, B: KeyValueBackend> {
    store: &'a PlaybookStore<B>,
}

impl<'a, B: KeyValueBackend> Delete<'a, B> {
    pub(crate) fn new(store: &'a PlaybookStore<B>) -> Self {
        Self { store }
    }

    /// Deletes the stored record for `key`.
    ///
    /// Deleting an absent key reports [`DeleteOutcome::NotFound`]; a backend
    /// without delete reports [`DeleteOutcome::Unsupported`]. Neither is an
    /// error. Returns `None` only when the backend failed.
    pub async fn variable(&self, key: &str) -> Option<DeleteOutcome> {
        let context = self.store.context();
        if !self.store.backend().supports_delete() {
            tracing::debug!(variable = key, "backend has no delete, nothing removed");
            return Some(DeleteOutcome::Unsupported);
        }
        match self.store.backend().delete(context, key).await {
            Ok(outcome) => {
                tracing::debug!(variable = key, context = context, ?outcome, "deleted variable");
                Some(outcome)
            },
            Err(StorageError::Unsupported { .. }) => {
                tracing::debug!(variable = key, "backend has no delete, nothing removed");
                Some(DeleteOutcome::Unsupported)
            },
            Err(e) => {
                tracing::warn!(variable = key, context = context, error = %e, "failed to delete variable");
                None
            },
        }
    }
}
