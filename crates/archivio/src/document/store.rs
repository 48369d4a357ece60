//! Status and result persistence seam.

use crate::document::DocumentStatus;
use crate::types::ExtractionResult;
use crate::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Durable persistence of document statuses and extraction results.
///
/// `record_status` must be durable before it returns: an observer reading
/// the store sees `Processing` even if the process dies before the terminal
/// transition. `replace_result` keeps at most one current result per
/// document; reprocessing replaces, never appends.
pub trait StatusStore: Send + Sync {
    fn record_status(&self, document_id: Uuid, status: DocumentStatus) -> Result<()>;
    fn replace_result(&self, document_id: Uuid, result: &ExtractionResult) -> Result<()>;
}

/// In-memory store for tests and single-process embedding.
///
/// Keeps the full status history per document so tests can assert on the
/// exact transition sequence.
#[derive(Default)]
pub struct InMemoryStatusStore {
    statuses: RwLock<HashMap<Uuid, Vec<DocumentStatus>>>,
    results: RwLock<HashMap<Uuid, ExtractionResult>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently recorded status, if any.
    pub fn status(&self, document_id: Uuid) -> Option<DocumentStatus> {
        self.statuses
            .read()
            .get(&document_id)
            .and_then(|history| history.last().copied())
    }

    /// Full status transition history for a document.
    pub fn status_history(&self, document_id: Uuid) -> Vec<DocumentStatus> {
        self.statuses
            .read()
            .get(&document_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Current extraction result for a document, if any.
    pub fn result(&self, document_id: Uuid) -> Option<ExtractionResult> {
        self.results.read().get(&document_id).cloned()
    }
}

impl StatusStore for InMemoryStatusStore {
    fn record_status(&self, document_id: Uuid, status: DocumentStatus) -> Result<()> {
        self.statuses
            .write()
            .entry(document_id)
            .or_default()
            .push(status);
        Ok(())
    }

    fn replace_result(&self, document_id: Uuid, result: &ExtractionResult) -> Result<()> {
        self.results.write().insert(document_id, result.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result_with_text(text: &str) -> ExtractionResult {
        ExtractionResult {
            text: text.to_string(),
            raw_text: text.to_string(),
            confidence: 90.0,
            word_confidences: vec![90],
            artifact_path: PathBuf::from("/tmp/a.png"),
        }
    }

    #[test]
    fn test_status_history_is_ordered() {
        let store = InMemoryStatusStore::new();
        let id = Uuid::new_v4();

        store.record_status(id, DocumentStatus::Processing).unwrap();
        store.record_status(id, DocumentStatus::Completed).unwrap();

        assert_eq!(
            store.status_history(id),
            vec![DocumentStatus::Processing, DocumentStatus::Completed]
        );
        assert_eq!(store.status(id), Some(DocumentStatus::Completed));
    }

    #[test]
    fn test_replace_result_keeps_single_result() {
        let store = InMemoryStatusStore::new();
        let id = Uuid::new_v4();

        store.replace_result(id, &result_with_text("first")).unwrap();
        store.replace_result(id, &result_with_text("second")).unwrap();

        assert_eq!(store.result(id).unwrap().text, "second");
    }

    #[test]
    fn test_unknown_document_has_no_state() {
        let store = InMemoryStatusStore::new();
        let id = Uuid::new_v4();
        assert!(store.status(id).is_none());
        assert!(store.status_history(id).is_empty());
        assert!(store.result(id).is_none());
    }
}
