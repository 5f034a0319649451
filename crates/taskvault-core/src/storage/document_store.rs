use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{DocumentFormat, JsonFormat, SaveReport, StoreError};

/// Whole-document persistence contract. Every save replaces the document.
pub trait DocumentStore: Send + Sync {
    /// Current document, or the format's empty document when nothing was saved.
    fn load(&self) -> Result<Vec<u8>, StoreError>;

    /// Replace the document. The payload must be well-formed in the store's format.
    fn save(&self, document: &[u8]) -> Result<SaveReport, StoreError>;
}

/// In-memory document store for tests and smoke runs.
/// The mask only keeps plaintext out of the buffer; it is not encryption.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore<F: DocumentFormat = JsonFormat> {
    inner: Arc<Mutex<Option<Vec<u8>>>>,
    format: F,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_format(JsonFormat)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: DocumentFormat> InMemoryDocumentStore<F> {
    pub fn with_format(format: F) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            format,
        }
    }
}

impl<F: DocumentFormat> DocumentStore for InMemoryDocumentStore<F> {
    fn load(&self) -> Result<Vec<u8>, StoreError> {
        let guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        Ok(match guard.as_deref() {
            Some(masked) => mask(masked),
            None => self.format.empty_document().to_vec(),
        })
    }

    fn save(&self, document: &[u8]) -> Result<SaveReport, StoreError> {
        if document.is_empty() {
            return Err(StoreError::InvalidInput {
                reason: "data cannot be empty".to_string(),
            });
        }
        self.format
            .validate(document)
            .map_err(|reason| StoreError::InvalidInput { reason })?;

        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(mask(document));
        debug!(bytes = document.len(), format = self.format.name(), "document saved in memory");
        Ok(SaveReport::default())
    }
}

const MASK_BYTE: u8 = 0xA5;

fn mask(input: &[u8]) -> Vec<u8> {
    input.iter().map(|b| b ^ MASK_BYTE).collect()
}
