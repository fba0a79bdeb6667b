//! HTTP API server.
//!
//! Exposes the document upload, listing, download, deletion, and
//! question-answering endpoints over JSON (multipart for uploads).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/documents/upload` | Multipart upload, field `patientId` + `documents` files |
//! | `GET`  | `/documents/patient/{id}` | List an owner's document metadata |
//! | `GET`  | `/documents/download/{id}` | Redirect to the stored object URL |
//! | `DELETE` | `/documents/{id}` | Delete a document and its embedding |
//! | `POST` | `/documents/embedding-response` | Answer a question from the owner's documents |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses carry a machine-readable code and message:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Patient ID is required." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `upstream_error` (502),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use dossier_core::embedding::EmbeddingGenerator;
use dossier_core::models::Document;
use dossier_core::storage::ObjectStorage;
use dossier_core::store::{DocumentRepository, EmbeddingStore};
use dossier_core::synthesis::AnswerSynthesizer;

use crate::config::Config;
use crate::db;
use crate::ingest::{self, format_ts_iso, UploadedFile};
use crate::object_store::S3Store;
use crate::providers;
use crate::query::{self, QueryError};
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    documents: Arc<dyn DocumentRepository>,
    embeddings: Arc<dyn EmbeddingStore>,
    storage: Arc<dyn ObjectStorage>,
    generator: Arc<dyn EmbeddingGenerator>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
}

/// Build the router for the given state.
fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Multipart bodies may hold a full batch of files.
    let body_limit =
        state.config.upload.max_file_bytes * state.config.upload.max_files + 1024 * 1024;

    Router::new()
        .route("/documents/upload", post(handle_upload))
        .route("/documents/patient/{id}", get(handle_list_documents))
        .route("/documents/download/{id}", get(handle_download))
        .route("/documents/{id}", delete(handle_delete))
        .route("/documents/embedding-response", post(handle_answer))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP API server.
///
/// Binds to the address configured in `[server].bind` and serves until the
/// process is terminated. Production collaborators are wired here: SQLite
/// stores, the S3 object store, and the configured providers.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let generator = providers::create_embedding_generator(&config.embedding)?;
    let synthesizer = providers::create_answer_synthesizer(&config.synthesis)?;

    let pool = db::connect(&config).await?;
    let store = Arc::new(SqliteStore::new(
        pool,
        generator.model_name(),
        generator.dims(),
    ));
    let storage = Arc::new(S3Store::new(config.storage.clone()));

    let state = AppState {
        config,
        documents: store.clone(),
        embeddings: store,
        storage,
        generator: Arc::from(generator),
        synthesizer: Arc::from(synthesizer),
    };

    let app = router(state);

    println!("API server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Constructs a 502 error for external collaborator failures.
fn upstream_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream_error".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 Internal Server Error.
fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /documents/upload ============

/// JSON response body for a processed upload batch.
#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    message: String,
    documents: Vec<ingest::UploadResult>,
}

/// Handler for `POST /documents/upload`.
///
/// Reads the multipart request (field `patientId` plus one or more
/// `documents` file parts), enforces the count and per-file size limits,
/// and runs the ingestion pipeline. Per-file failures appear as `error`
/// entries in the result list; the response itself is a 200.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let max_files = state.config.upload.max_files;
    let max_file_bytes = state.config.upload.max_file_bytes;

    let mut owner_id: Option<String> = None;
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Malformed multipart request: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string());
        match field_name.as_deref() {
            Some("patientId") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Malformed patientId field: {}", e)))?;
                owner_id = Some(value);
            }
            Some("documents") => {
                if files.len() >= max_files {
                    return Err(bad_request(format!(
                        "Too many files. Maximum {} files allowed.",
                        max_files
                    )));
                }

                let file_name = field.file_name().unwrap_or("upload").to_string();
                let media_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read file {}: {}", file_name, e)))?;

                if bytes.len() > max_file_bytes {
                    return Err(bad_request(format!(
                        "File too large. Maximum size is {}MB.",
                        max_file_bytes / (1024 * 1024)
                    )));
                }

                files.push(UploadedFile {
                    file_name,
                    media_type,
                    bytes: bytes.to_vec(),
                    document_id: None,
                });
            }
            _ => {}
        }
    }

    let owner_id = match owner_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(bad_request("Patient ID is required.")),
    };
    if files.is_empty() {
        return Err(bad_request("No files uploaded."));
    }

    let results = ingest::ingest_upload(
        state.documents.as_ref(),
        state.embeddings.as_ref(),
        state.storage.as_ref(),
        state.generator.as_ref(),
        &owner_id,
        &state.config.storage.prefix,
        files,
    )
    .await;

    Ok(Json(UploadResponse {
        success: true,
        message: "Files uploaded successfully.".to_string(),
        documents: results,
    }))
}

// ============ GET /documents/patient/{id} ============

/// One document's metadata in a listing response.
#[derive(Serialize)]
struct DocumentInfo {
    id: String,
    name: String,
    size: i64,
    #[serde(rename = "type")]
    media_type: String,
    #[serde(rename = "uploadDate")]
    upload_date: String,
    status: String,
}

impl DocumentInfo {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.file_name.clone(),
            size: doc.size_bytes,
            media_type: doc.media_type.clone(),
            upload_date: format_ts_iso(doc.uploaded_at),
            status: doc.status.as_str().to_string(),
        }
    }
}

/// JSON response body for a document listing.
#[derive(Serialize)]
struct ListDocumentsResponse {
    success: bool,
    documents: Vec<DocumentInfo>,
}

/// Handler for `GET /documents/patient/{id}`.
async fn handle_list_documents(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<ListDocumentsResponse>, AppError> {
    if owner_id.trim().is_empty() {
        return Err(bad_request("Patient ID is required."));
    }

    let docs = state
        .documents
        .list_by_owner(&owner_id)
        .await
        .map_err(|e| internal(format!("Failed to list documents: {}", e)))?;

    Ok(Json(ListDocumentsResponse {
        success: true,
        documents: docs.iter().map(DocumentInfo::from_document).collect(),
    }))
}

// ============ GET /documents/download/{id} ============

/// Handler for `GET /documents/download/{id}`.
///
/// Redirects to the stored object's URL rather than proxying the bytes.
async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let doc = state
        .documents
        .get(&id)
        .await
        .map_err(|e| internal(format!("Failed to fetch document: {}", e)))?
        .ok_or_else(|| not_found("Document not found."))?;

    let url = doc
        .storage_url
        .ok_or_else(|| not_found("File URL not found."))?;

    Ok(Redirect::to(&url))
}

// ============ DELETE /documents/{id} ============

/// JSON response body for a deletion.
#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
    message: String,
}

/// Handler for `DELETE /documents/{id}`.
async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let removed = ingest::remove_document(
        state.documents.as_ref(),
        state.embeddings.as_ref(),
        state.storage.as_ref(),
        &id,
    )
    .await
    .map_err(|e| internal(format!("Failed to delete document: {}", e)))?;

    if !removed {
        return Err(not_found("Document not found."));
    }

    Ok(Json(DeleteResponse {
        success: true,
        message: "Document deleted successfully.".to_string(),
    }))
}

// ============ POST /documents/embedding-response ============

/// JSON request body for a question.
#[derive(Deserialize)]
struct AnswerRequest {
    query: String,
    #[serde(rename = "userId")]
    user_id: String,
    limit: Option<usize>,
}

/// JSON response body for an answer.
///
/// `error` is present only for the degraded case: ranking succeeded but
/// synthesis failed, and `response` carries the fixed fallback text.
#[derive(Serialize)]
struct AnswerResponse {
    success: bool,
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Handler for `POST /documents/embedding-response`.
async fn handle_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let answer = query::answer(
        state.embeddings.as_ref(),
        state.generator.as_ref(),
        state.synthesizer.as_ref(),
        &req.query,
        &req.user_id,
        req.limit,
    )
    .await
    .map_err(|e| match e {
        QueryError::Validation(msg) => bad_request(msg),
        QueryError::NotFound(msg) => not_found(msg),
        QueryError::Upstream(msg) => upstream_error(msg),
    })?;

    Ok(Json(AnswerResponse {
        success: true,
        error: answer
            .degraded
            .then(|| "answer generation failed".to_string()),
        response: answer.response,
    }))
}
