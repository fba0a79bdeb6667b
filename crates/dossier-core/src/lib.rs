//! # Dossier Core
//!
//! Shared logic for Dossier: data models, the similarity ranker, store
//! abstractions, and the provider traits for embedding generation, answer
//! synthesis, and object storage.
//!
//! This crate contains no tokio, sqlx, HTTP clients, or other native-only
//! dependencies. The application crate supplies the concrete providers and
//! the SQLite-backed stores.

pub mod embedding;
pub mod models;
pub mod rank;
pub mod storage;
pub mod store;
pub mod synthesis;
