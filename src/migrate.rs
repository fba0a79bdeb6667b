use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Document metadata rows, one per upload
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            file_name TEXT NOT NULL,
            media_type TEXT NOT NULL DEFAULT 'application/octet-stream',
            size_bytes INTEGER NOT NULL,
            storage_path TEXT NOT NULL,
            storage_url TEXT,
            uploaded_at INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'uploaded'
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // One embedding record per document; vector stored as LE f32 bytes
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_embeddings (
            document_id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            embedding BLOB NOT NULL,
            text TEXT NOT NULL,
            model TEXT NOT NULL DEFAULT '',
            dims INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_owner_id ON documents(owner_id)")
        .execute(&pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_document_embeddings_owner_id ON document_embeddings(owner_id)",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_uploaded_at ON documents(uploaded_at DESC)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
