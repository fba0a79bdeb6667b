//! Query pipeline orchestration.
//!
//! Embeds the question, fetches the owner's candidate set, ranks it, and
//! hands the top texts to the synthesizer. Validation happens before any
//! external call; a synthesizer failure after successful ranking degrades
//! to a fixed fallback answer instead of failing the request.

use dossier_core::embedding::EmbeddingGenerator;
use dossier_core::rank::rank;
use dossier_core::store::EmbeddingStore;
use dossier_core::synthesis::AnswerSynthesizer;

/// Hard cap on how many candidates one query may request.
pub const MAX_LIMIT: usize = 20;
/// Candidates used when the caller doesn't specify a limit.
pub const DEFAULT_LIMIT: usize = 5;

/// Instruction pinned to every synthesis call: answer from the supplied
/// context only, and say so when the context isn't enough.
const SYSTEM_INSTRUCTION: &str = "You are an assistant that answers questions using only the \
document context provided in the prompt. If the context does not contain enough information \
to answer, say so explicitly instead of guessing. Keep answers clear, concise, and accurate.";

/// Answer returned when the synthesizer itself fails.
const FALLBACK_ANSWER: &str = "Unable to generate an answer right now. Please try again later.";

/// Query pipeline failure, typed for the HTTP layer.
#[derive(Debug)]
pub enum QueryError {
    /// Missing or malformed caller input; rejected before any external call.
    Validation(String),
    /// The owner has no stored embeddings.
    NotFound(String),
    /// An external collaborator (embedding model or store) failed.
    Upstream(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::Validation(msg) => write!(f, "{}", msg),
            QueryError::NotFound(msg) => write!(f, "{}", msg),
            QueryError::Upstream(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for QueryError {}

/// A synthesized answer.
///
/// `degraded` is set when ranking succeeded but synthesis failed and the
/// response carries the fallback text — the envelope is still a success
/// so the caller-facing contract stays uniform.
#[derive(Debug, Clone)]
pub struct Answer {
    pub response: String,
    pub degraded: bool,
}

/// Answer a natural-language question from one owner's documents.
pub async fn answer(
    embeddings: &dyn EmbeddingStore,
    generator: &dyn EmbeddingGenerator,
    synthesizer: &dyn AnswerSynthesizer,
    query: &str,
    owner_id: &str,
    limit: Option<usize>,
) -> Result<Answer, QueryError> {
    if query.trim().is_empty() {
        return Err(QueryError::Validation("Query is required.".to_string()));
    }
    if owner_id.trim().is_empty() {
        return Err(QueryError::Validation("Owner id is required.".to_string()));
    }
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let query_vector = generator
        .embed(query)
        .await
        .map_err(|e| QueryError::Upstream(format!("Query embedding failed: {}", e)))?;

    let candidates = embeddings
        .select_by_owner(owner_id)
        .await
        .map_err(|e| QueryError::Upstream(format!("Embedding store failed: {}", e)))?;

    if candidates.is_empty() {
        return Err(QueryError::NotFound(format!(
            "No document embeddings found for owner {}. Upload some documents first.",
            owner_id
        )));
    }

    let top = rank(&query_vector, &candidates, limit);

    let context: String = top
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let user_prompt = format!(
        "Context from documents:\n{}\n\nQuestion: {}\n\nAnswer the question using the context above.",
        context, query
    );

    match synthesizer.complete(SYSTEM_INSTRUCTION, &user_prompt).await {
        Ok(response) => Ok(Answer {
            response,
            degraded: false,
        }),
        Err(e) => {
            // Ranking worked; only generation failed. Degrade, don't error.
            eprintln!("Warning: answer synthesis failed: {}", e);
            Ok(Answer {
                response: FALLBACK_ANSWER.to_string(),
                degraded: true,
            })
        }
    }
}
