//! Integration tests for the SQLite-backed stores.
//!
//! Runs the real migrations against a temporary database file and checks
//! the store trait contracts the pipelines rely on.

use tempfile::TempDir;

use dossier::config::{Config, DbConfig, ServerConfig, StorageConfig};
use dossier::migrate;
use dossier::sqlite_store::SqliteStore;
use dossier_core::models::{Document, DocumentStatus, EmbeddingRecord};
use dossier_core::store::{DocumentRepository, EmbeddingStore};

fn test_config(tmp: &TempDir) -> Config {
    Config {
        db: DbConfig {
            path: tmp.path().join("data").join("dossier.sqlite"),
        },
        storage: StorageConfig {
            bucket: "test-bucket".to_string(),
            region: "us-east-1".to_string(),
            prefix: "documents".to_string(),
            endpoint_url: None,
        },
        embedding: Default::default(),
        synthesis: Default::default(),
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
        upload: Default::default(),
    }
}

async fn open_store(config: &Config) -> SqliteStore {
    migrate::run_migrations(config).await.unwrap();
    let pool = dossier::db::connect(config).await.unwrap();
    SqliteStore::new(pool, "test-model", 4)
}

fn document(id: &str, owner: &str, uploaded_at: i64) -> Document {
    Document {
        id: id.to_string(),
        owner_id: owner.to_string(),
        file_name: format!("{}.txt", id),
        media_type: "text/plain".to_string(),
        size_bytes: 42,
        storage_path: format!("documents/owner-{}/{}.txt", owner, id),
        storage_url: Some(format!("https://storage.test/{}.txt", id)),
        uploaded_at,
        status: DocumentStatus::Uploaded,
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);

    migrate::run_migrations(&config).await.unwrap();
    migrate::run_migrations(&config).await.unwrap();
}

#[tokio::test]
async fn document_lifecycle_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = open_store(&config).await;

    // `insert` exists on both store traits, so calls here are qualified.
    DocumentRepository::insert(&store, &document("d1", "o1", 100))
        .await
        .unwrap();
    DocumentRepository::insert(&store, &document("d2", "o1", 200))
        .await
        .unwrap();
    DocumentRepository::insert(&store, &document("d3", "o2", 300))
        .await
        .unwrap();

    // Newest first, owner-scoped.
    let docs = store.list_by_owner("o1").await.unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id, "d2");
    assert_eq!(docs[1].id, "d1");

    let fetched = store.get("d1").await.unwrap().unwrap();
    assert_eq!(fetched.status, DocumentStatus::Uploaded);
    assert_eq!(fetched.file_name, "d1.txt");
    assert_eq!(fetched.storage_url.as_deref(), Some("https://storage.test/d1.txt"));

    store
        .set_status("d1", DocumentStatus::Embedded)
        .await
        .unwrap();
    let fetched = store.get("d1").await.unwrap().unwrap();
    assert_eq!(fetched.status, DocumentStatus::Embedded);

    DocumentRepository::delete(&store, "d1").await.unwrap();
    assert!(store.get("d1").await.unwrap().is_none());
    assert_eq!(store.list_by_owner("o1").await.unwrap().len(), 1);

    store.pool().close().await;
}

#[tokio::test]
async fn embedding_records_roundtrip_and_replace() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = open_store(&config).await;

    let record = EmbeddingRecord {
        owner_id: "o1".to_string(),
        document_id: "d1".to_string(),
        vector: vec![1.0, -2.5, 3.125, 0.0],
        text: "original text".to_string(),
    };
    EmbeddingStore::insert(&store, &record).await.unwrap();

    let fetched = store.select_by_owner("o1").await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].vector, vec![1.0, -2.5, 3.125, 0.0]);
    assert_eq!(fetched[0].text, "original text");

    // Re-ingestion replaces the record rather than appending.
    let replacement = EmbeddingRecord {
        vector: vec![0.5, 0.5, 0.5, 0.5],
        text: "replacement text".to_string(),
        ..record
    };
    EmbeddingStore::insert(&store, &replacement).await.unwrap();

    let fetched = store.select_by_owner("o1").await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].text, "replacement text");

    store.delete_by_document("d1").await.unwrap();
    assert!(store.select_by_owner("o1").await.unwrap().is_empty());

    store.pool().close().await;
}
