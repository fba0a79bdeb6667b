//! # Dossier CLI (`dsr`)
//!
//! The `dsr` binary is the operational interface for Dossier. It provides
//! commands for database initialization, question answering, and starting
//! the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! dsr --config ./config/dossier.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dsr init` | Create the SQLite database and run schema migrations |
//! | `dsr ask "<query>" --owner <id>` | Answer a question from an owner's documents |
//! | `dsr serve` | Start the HTTP API server |

mod ask;
mod config;
mod db;
mod extract;
mod ingest;
mod migrate;
mod object_store;
mod providers;
mod query;
mod server;
mod sqlite_store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dossier CLI — a document ingestion and retrieval-augmented QA service.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/dossier.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "dsr",
    about = "Dossier — a document ingestion and retrieval-augmented QA service",
    version,
    long_about = "Dossier ingests uploaded documents, extracts and embeds their text, \
    and answers natural-language questions by retrieving the most relevant stored texts \
    and feeding them to a language model."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/dossier.toml`. Database, storage, provider,
    /// and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/dossier.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, document_embeddings). This command is idempotent —
    /// running it multiple times is safe.
    Init,

    /// Answer a question from an owner's documents.
    ///
    /// Embeds the query, ranks the owner's stored embeddings by cosine
    /// similarity, and synthesizes an answer from the top matches.
    /// Requires embedding and synthesis providers to be configured.
    Ask {
        /// The question to answer.
        query: String,

        /// Owner id whose documents are searched.
        #[arg(long)]
        owner: String,

        /// Maximum number of context passages to use (1–20, default 5).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Start the HTTP API server.
    ///
    /// Exposes the upload, listing, download, deletion, and
    /// question-answering endpoints on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ask {
            query,
            owner,
            limit,
        } => {
            ask::run_ask(&cfg, &query, &owner, limit).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
