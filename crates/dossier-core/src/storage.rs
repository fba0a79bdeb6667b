//! Object storage trait.
//!
//! The document bytes themselves live in an external object store. The
//! trait is deliberately narrow — upload, download, remove — so the
//! ingestion pipeline and the HTTP layer never see storage specifics.

use anyhow::Result;
use async_trait::async_trait;

/// Boundary to an external object store (S3-compatible in production).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `path` and return a browsable URL for the object.
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String>;
    /// Fetch the raw bytes stored at `path`.
    async fn download(&self, path: &str) -> Result<Vec<u8>>;
    /// Delete the object at `path`.
    async fn remove(&self, path: &str) -> Result<()>;
}
