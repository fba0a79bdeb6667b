//! Core data models used throughout Dossier.
//!
//! These types represent the documents, embedding records, and ranked
//! candidates that flow through the ingestion and retrieval pipeline.

use serde::Serialize;

/// Lifecycle status of an uploaded document.
///
/// `Uploaded` is the initial state. The ingestion pipeline moves the
/// document to exactly one terminal state: `Embedded` on success,
/// `Skipped` when extraction yields no text, or `EmbeddingFailed` when
/// any pipeline step fails. A failed embedding never fails the upload —
/// the document stays retrievable, it just won't surface in answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Embedded,
    EmbeddingFailed,
    Skipped,
}

impl DocumentStatus {
    /// Stable string form used in the database and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Embedded => "embedded",
            DocumentStatus::EmbeddingFailed => "embedding_failed",
            DocumentStatus::Skipped => "skipped",
        }
    }

    /// Parse the stored string form. Unknown values fall back to `Uploaded`
    /// so a schema from an older deployment never breaks listing.
    pub fn parse(s: &str) -> Self {
        match s {
            "embedded" => DocumentStatus::Embedded,
            "embedding_failed" => DocumentStatus::EmbeddingFailed,
            "skipped" => DocumentStatus::Skipped,
            _ => DocumentStatus::Uploaded,
        }
    }
}

/// An uploaded document's metadata row.
///
/// Created once per successful upload; only `status` changes afterwards.
/// Deleting a document removes the stored object bytes and any embedding
/// record along with this row.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    /// The owning entity (patient/user). All retrieval is owner-partitioned.
    pub owner_id: String,
    /// Original filename as supplied by the uploader.
    pub file_name: String,
    /// Declared media type from the upload request.
    pub media_type: String,
    pub size_bytes: i64,
    /// Key of the object in external storage.
    pub storage_path: String,
    /// Browsable URL for the stored object, if the backend provides one.
    pub storage_url: Option<String>,
    /// Upload timestamp (Unix epoch seconds).
    pub uploaded_at: i64,
    pub status: DocumentStatus,
}

/// One stored (owner, document, vector, text) tuple.
///
/// The vector's length is fixed by the embedding model in use; records of
/// a different length are scored 0 by the ranker rather than compared.
/// At most one record exists per document id — re-ingesting a document
/// replaces its record.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub owner_id: String,
    pub document_id: String,
    pub vector: Vec<f32>,
    /// The exact source text the vector was derived from.
    pub text: String,
}

/// A scored retrieval candidate, produced by the ranker for one query and
/// discarded after the response is built.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub document_id: String,
    pub text: String,
    pub score: f32,
}
