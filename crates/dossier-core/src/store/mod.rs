//! Storage abstraction for Dossier.
//!
//! Two traits cover everything the pipeline persists: [`DocumentRepository`]
//! for document metadata and [`EmbeddingStore`] for (owner, document,
//! vector, text) tuples. The application crate provides SQLite-backed
//! implementations; [`memory`] provides in-memory ones for tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, DocumentStatus, EmbeddingRecord};

/// Document metadata persistence.
///
/// Documents are created once on upload; afterwards only their status
/// changes. Deletion of the stored object bytes and the embedding record
/// is the orchestrator's job — `delete` removes only the metadata row.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Insert a new document row.
    async fn insert(&self, doc: &Document) -> Result<()>;

    /// All documents belonging to `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Document>>;

    /// Fetch a document by id.
    async fn get(&self, id: &str) -> Result<Option<Document>>;

    /// Record a lifecycle transition.
    async fn set_status(&self, id: &str, status: DocumentStatus) -> Result<()>;

    /// Remove the metadata row.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Embedding record persistence.
///
/// `insert` has replace-by-document semantics: at most one record exists
/// per document id, so re-ingesting a document swaps its record rather
/// than appending a duplicate.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Store a record, replacing any existing record for the same document.
    async fn insert(&self, record: &EmbeddingRecord) -> Result<()>;

    /// Bulk-fetch every record for `owner_id`, in insertion order.
    async fn select_by_owner(&self, owner_id: &str) -> Result<Vec<EmbeddingRecord>>;

    /// Remove the record for a document, if any.
    async fn delete_by_document(&self, document_id: &str) -> Result<()>;
}
