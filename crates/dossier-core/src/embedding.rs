//! Embedding generator trait and vector serialization helpers.
//!
//! [`EmbeddingGenerator`] is the boundary to the external embedding model.
//! Concrete implementations (OpenAI, Ollama) live in the application crate;
//! tests supply deterministic in-process generators.

use anyhow::Result;
use async_trait::async_trait;

/// Boundary to an external embedding model.
///
/// `embed` converts text into a fixed-length vector; the dimensionality is
/// constant per deployment and reported by [`dims`](EmbeddingGenerator::dims).
#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a single text into a vector of [`dims`](EmbeddingGenerator::dims) length.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing
/// a BLOB of `vec.len() × 4` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]: reads 4-byte little-endian `f32` values
/// from the byte slice.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
