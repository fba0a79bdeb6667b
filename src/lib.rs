//! # Dossier
//!
//! A document ingestion and retrieval-augmented QA service.
//!
//! Dossier ingests uploaded documents for an owner (a patient or user),
//! extracts their text, embeds it via an external embedding model, and
//! answers natural-language questions by ranking the stored embeddings
//! against the query and synthesizing an answer from the top matches.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────┐   ┌──────────┐
//! │  Upload   │──▶│     Pipeline      │──▶│  SQLite   │
//! │ multipart │   │ Extract+Embed    │   │ + S3 blob │
//! └──────────┘   └───────────────────┘   └────┬─────┘
//!                                             │
//!                         ┌───────────────────┤
//!                         ▼                   ▼
//!                    ┌──────────┐       ┌──────────┐
//!                    │   CLI    │       │   HTTP   │
//!                    │  (dsr)   │       │  (axum)  │
//!                    └──────────┘       └──────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. **Upload** stores the raw bytes in object storage ([`object_store`])
//!    and creates a document row.
//! 2. The **ingestion pipeline** ([`ingest`]) downloads the bytes, extracts
//!    plain text ([`extract`]), embeds it ([`providers`]), and writes the
//!    embedding record. Failures downgrade to a per-document status.
//! 3. The **query pipeline** ([`query`]) embeds the question, ranks the
//!    owner's records by cosine similarity, and synthesizes an answer from
//!    the top texts.
//! 4. Both pipelines are exposed via the **CLI** (`dsr`) and the **HTTP
//!    server** ([`server`]).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`extract`] | Multi-format text extraction (PDF, docx, txt, HTML) |
//! | [`providers`] | Embedding and synthesis backends (OpenAI, Ollama) |
//! | [`object_store`] | S3-compatible object storage client (SigV4) |
//! | [`sqlite_store`] | SQLite-backed store implementations |
//! | [`ingest`] | Upload + embedding pipeline orchestration |
//! | [`query`] | Question answering over stored embeddings |
//! | [`server`] | HTTP API server |
//! | [`ask`] | CLI question answering |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod ask;
pub mod config;
pub mod db;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod object_store;
pub mod providers;
pub mod query;
pub mod server;
pub mod sqlite_store;
