//! Ingestion pipeline orchestration.
//!
//! Coordinates the flow for one uploaded file: object storage upload →
//! document row → download → text extraction → embedding → embedding store.
//!
//! Two failure boundaries matter here:
//! - Per-file isolation: one bad file in a batch yields an `error` entry in
//!   the per-file result list and never blocks the remaining files.
//! - Upload/embedding decoupling: once the document row exists, embedding
//!   failures downgrade to a recorded status (`embedding_failed`). The
//!   upload is still a success; the document just won't surface in answers.

use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

use dossier_core::embedding::EmbeddingGenerator;
use dossier_core::models::{Document, DocumentStatus, EmbeddingRecord};
use dossier_core::storage::ObjectStorage;
use dossier_core::store::{DocumentRepository, EmbeddingStore};

use crate::extract;

/// One uploaded file, already read out of the multipart request.
pub struct UploadedFile {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    /// Caller-supplied document id. Preserved when present, minted otherwise.
    pub document_id: Option<String>,
}

/// Per-file entry in the upload response.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub id: String,
    pub name: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(rename = "uploadDate")]
    pub upload_date: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Terminal state of the embedding pipeline for one stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Embedded,
    Skipped,
    Failed,
}

/// Format a Unix timestamp as ISO 8601.
pub fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Ingest a batch of uploaded files for one owner.
///
/// Files are processed sequentially; each gets exactly one entry in the
/// returned list, marked `success` or `error`. Errors never escape to the
/// caller — the HTTP layer always receives a full result list.
pub async fn ingest_upload(
    documents: &dyn DocumentRepository,
    embeddings: &dyn EmbeddingStore,
    storage: &dyn ObjectStorage,
    generator: &dyn EmbeddingGenerator,
    owner_id: &str,
    storage_prefix: &str,
    files: Vec<UploadedFile>,
) -> Vec<UploadResult> {
    let mut results = Vec::with_capacity(files.len());

    for file in files {
        let name = file.file_name.clone();
        let size = file.bytes.len() as i64;
        let media_type = file.media_type.clone();

        match store_file(documents, storage, owner_id, storage_prefix, file).await {
            Ok(doc) => {
                // Non-fatal: a failed embedding leaves the upload successful.
                embed_document(documents, embeddings, storage, generator, &doc).await;

                results.push(UploadResult {
                    id: doc.id,
                    name: doc.file_name,
                    size: doc.size_bytes,
                    media_type: doc.media_type,
                    upload_date: format_ts_iso(doc.uploaded_at),
                    status: "success".to_string(),
                    url: doc.storage_url,
                });
            }
            Err(e) => {
                eprintln!("Warning: upload failed for {}: {}", name, e);
                results.push(UploadResult {
                    id: Uuid::new_v4().to_string(),
                    name,
                    size,
                    media_type,
                    upload_date: format_ts_iso(chrono::Utc::now().timestamp()),
                    status: "error".to_string(),
                    url: None,
                });
            }
        }
    }

    results
}

/// Upload the bytes to object storage and create the document row.
async fn store_file(
    documents: &dyn DocumentRepository,
    storage: &dyn ObjectStorage,
    owner_id: &str,
    storage_prefix: &str,
    file: UploadedFile,
) -> Result<Document> {
    // Preserve the caller's id when it supplied one.
    let doc_id = file
        .document_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let extension = std::path::Path::new(&file.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    let storage_path = format!("{}/owner-{}/{}{}", storage_prefix, owner_id, doc_id, extension);

    let url = storage
        .upload(&storage_path, &file.bytes, &file.media_type)
        .await?;

    let doc = Document {
        id: doc_id,
        owner_id: owner_id.to_string(),
        file_name: file.file_name,
        media_type: file.media_type,
        size_bytes: file.bytes.len() as i64,
        storage_path,
        storage_url: Some(url),
        uploaded_at: chrono::Utc::now().timestamp(),
        status: DocumentStatus::Uploaded,
    };

    documents.insert(&doc).await?;
    Ok(doc)
}

/// Run the embedding pipeline for a stored document and record the outcome.
///
/// `uploaded → extracting → embedding → embedded`, or `skipped` when the
/// extracted text is blank, or `embedding_failed` when any step errors.
/// Never returns an error: failures are logged and written to the
/// document's status instead.
pub async fn embed_document(
    documents: &dyn DocumentRepository,
    embeddings: &dyn EmbeddingStore,
    storage: &dyn ObjectStorage,
    generator: &dyn EmbeddingGenerator,
    doc: &Document,
) -> IngestOutcome {
    let outcome = match run_embedding_steps(embeddings, storage, generator, doc).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Warning: embedding failed for document {}: {}", doc.id, e);
            IngestOutcome::Failed
        }
    };

    let status = match outcome {
        IngestOutcome::Embedded => DocumentStatus::Embedded,
        IngestOutcome::Skipped => DocumentStatus::Skipped,
        IngestOutcome::Failed => DocumentStatus::EmbeddingFailed,
    };
    if let Err(e) = documents.set_status(&doc.id, status).await {
        eprintln!(
            "Warning: failed to record status for document {}: {}",
            doc.id, e
        );
    }

    outcome
}

async fn run_embedding_steps(
    embeddings: &dyn EmbeddingStore,
    storage: &dyn ObjectStorage,
    generator: &dyn EmbeddingGenerator,
    doc: &Document,
) -> Result<IngestOutcome> {
    let bytes = storage.download(&doc.storage_path).await?;

    let text =
        extract::extract_text(&bytes, &doc.file_name).map_err(|e| anyhow::anyhow!("{}", e))?;

    // Blank extraction is a clean skip: no placeholder vectors, ever.
    if text.trim().is_empty() {
        return Ok(IngestOutcome::Skipped);
    }

    let vector = generator.embed(&text).await?;

    embeddings
        .insert(&EmbeddingRecord {
            owner_id: doc.owner_id.clone(),
            document_id: doc.id.clone(),
            vector,
            text,
        })
        .await?;

    Ok(IngestOutcome::Embedded)
}

/// Delete a document: object bytes, embedding record, and metadata row.
///
/// Returns `false` when no such document exists. A storage delete failure
/// is logged but does not abort — the metadata and embedding rows still go.
pub async fn remove_document(
    documents: &dyn DocumentRepository,
    embeddings: &dyn EmbeddingStore,
    storage: &dyn ObjectStorage,
    id: &str,
) -> Result<bool> {
    let doc = match documents.get(id).await? {
        Some(doc) => doc,
        None => return Ok(false),
    };

    if let Err(e) = storage.remove(&doc.storage_path).await {
        eprintln!(
            "Warning: failed to delete stored object {}: {}",
            doc.storage_path, e
        );
    }

    embeddings.delete_by_document(id).await?;
    documents.delete(id).await?;
    Ok(true)
}
