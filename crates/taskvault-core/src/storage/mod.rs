//! Storage contracts consumed by the CLI and by any service embedding the
//! encrypted document store.

mod document_store;
mod error;
mod format;
mod report;

pub use document_store::{DocumentStore, InMemoryDocumentStore};
pub use error::{CryptoError, StoreError};
pub use format::{DocumentFormat, JsonFormat};
pub use report::{PruneReport, RestoreReport, SaveReport, StorageInfo, StorageWarning};
