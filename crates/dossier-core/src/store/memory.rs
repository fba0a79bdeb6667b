//! In-memory store implementations for testing.
//!
//! `Vec` behind `std::sync::RwLock` for thread safety. Insertion order is
//! preserved, which the ranker's stable tie-breaking relies on in tests.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, DocumentStatus, EmbeddingRecord};

use super::{DocumentRepository, EmbeddingStore};

/// In-memory [`DocumentRepository`] for tests.
pub struct InMemoryDocuments {
    docs: RwLock<Vec<Document>>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryDocuments {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocuments {
    async fn insert(&self, doc: &Document) -> Result<()> {
        self.docs.write().unwrap().push(doc.clone());
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Document>> {
        let docs = self.docs.read().unwrap();
        let mut out: Vec<Document> = docs
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let docs = self.docs.read().unwrap();
        Ok(docs.iter().find(|d| d.id == id).cloned())
    }

    async fn set_status(&self, id: &str, status: DocumentStatus) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        if let Some(doc) = docs.iter_mut().find(|d| d.id == id) {
            doc.status = status;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.docs.write().unwrap().retain(|d| d.id != id);
        Ok(())
    }
}

/// In-memory [`EmbeddingStore`] for tests.
pub struct InMemoryEmbeddings {
    records: RwLock<Vec<EmbeddingRecord>>,
}

impl InMemoryEmbeddings {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Total number of stored records, across all owners.
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryEmbeddings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingStore for InMemoryEmbeddings {
    async fn insert(&self, record: &EmbeddingRecord) -> Result<()> {
        let mut records = self.records.write().unwrap();
        records.retain(|r| r.document_id != record.document_id);
        records.push(record.clone());
        Ok(())
    }

    async fn select_by_owner(&self, owner_id: &str) -> Result<Vec<EmbeddingRecord>> {
        let records = self.records.read().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .retain(|r| r.document_id != document_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(owner: &str, doc: &str, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            owner_id: owner.to_string(),
            document_id: doc.to_string(),
            vector,
            text: format!("text of {}", doc),
        }
    }

    #[tokio::test]
    async fn test_insert_replaces_by_document() {
        let store = InMemoryEmbeddings::new();
        store.insert(&record("o1", "d1", vec![1.0])).await.unwrap();
        store.insert(&record("o1", "d1", vec![2.0])).await.unwrap();

        let records = store.select_by_owner("o1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].vector, vec![2.0]);
    }

    #[tokio::test]
    async fn test_select_is_owner_scoped() {
        let store = InMemoryEmbeddings::new();
        store.insert(&record("o1", "d1", vec![1.0])).await.unwrap();
        store.insert(&record("o2", "d2", vec![1.0])).await.unwrap();

        assert_eq!(store.select_by_owner("o1").await.unwrap().len(), 1);
        assert_eq!(store.select_by_owner("o3").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_document() {
        let store = InMemoryEmbeddings::new();
        store.insert(&record("o1", "d1", vec![1.0])).await.unwrap();
        store.delete_by_document("d1").await.unwrap();
        assert!(store.is_empty());
    }
}
