//! SQLite-backed implementations of the store traits.
//!
//! Maps each [`DocumentRepository`] and [`EmbeddingStore`] operation to SQL
//! against the schema created by [`crate::migrate`]. Vectors are stored as
//! little-endian f32 BLOBs via the core codec.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use dossier_core::embedding::{blob_to_vec, vec_to_blob};
use dossier_core::models::{Document, DocumentStatus, EmbeddingRecord};
use dossier_core::store::{DocumentRepository, EmbeddingStore};

/// SQLite store wrapping a [`SqlitePool`].
///
/// Implements both store traits; the same pool serves document metadata
/// and embedding rows.
pub struct SqliteStore {
    pool: SqlitePool,
    /// Model metadata recorded alongside each embedding row.
    model: String,
    dims: usize,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, model: &str, dims: usize) -> Self {
        Self {
            pool,
            model: model.to_string(),
            dims,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        file_name: row.get("file_name"),
        media_type: row.get("media_type"),
        size_bytes: row.get("size_bytes"),
        storage_path: row.get("storage_path"),
        storage_url: row.get("storage_url"),
        uploaded_at: row.get("uploaded_at"),
        status: DocumentStatus::parse(row.get("status")),
    }
}

#[async_trait]
impl DocumentRepository for SqliteStore {
    async fn insert(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, owner_id, file_name, media_type, size_bytes,
                                   storage_path, storage_url, uploaded_at, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.owner_id)
        .bind(&doc.file_name)
        .bind(&doc.media_type)
        .bind(doc.size_bytes)
        .bind(&doc.storage_path)
        .bind(&doc.storage_url)
        .bind(doc.uploaded_at)
        .bind(doc.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT * FROM documents WHERE owner_id = ? ORDER BY uploaded_at DESC, id ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_document))
    }

    async fn set_status(&self, id: &str, status: DocumentStatus) -> Result<()> {
        sqlx::query("UPDATE documents SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl EmbeddingStore for SqliteStore {
    async fn insert(&self, record: &EmbeddingRecord) -> Result<()> {
        let blob = vec_to_blob(&record.vector);
        let now = chrono::Utc::now().timestamp();

        // Replace-by-document: re-ingesting swaps the record, never appends.
        sqlx::query(
            r#"
            INSERT INTO document_embeddings (document_id, owner_id, embedding, text, model, dims, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(document_id) DO UPDATE SET
                owner_id = excluded.owner_id,
                embedding = excluded.embedding,
                text = excluded.text,
                model = excluded.model,
                dims = excluded.dims,
                created_at = excluded.created_at
            "#,
        )
        .bind(&record.document_id)
        .bind(&record.owner_id)
        .bind(&blob)
        .bind(&record.text)
        .bind(&self.model)
        .bind(self.dims as i64)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn select_by_owner(&self, owner_id: &str) -> Result<Vec<EmbeddingRecord>> {
        let rows = sqlx::query(
            "SELECT document_id, owner_id, embedding, text FROM document_embeddings
             WHERE owner_id = ? ORDER BY created_at ASC, document_id ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                EmbeddingRecord {
                    owner_id: row.get("owner_id"),
                    document_id: row.get("document_id"),
                    vector: blob_to_vec(&blob),
                    text: row.get("text"),
                }
            })
            .collect())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM document_embeddings WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
