//! Answer synthesizer trait.
//!
//! The synthesizer turns a system instruction plus a user prompt into a
//! natural-language answer. It is a pure boundary adapter: the query
//! orchestrator owns the prompt construction and the fallback policy when
//! the external service fails.

use anyhow::Result;
use async_trait::async_trait;

/// Boundary to an external chat-completion model.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
    /// Generate a completion for `user_prompt` under `system_instruction`.
    async fn complete(&self, system_instruction: &str, user_prompt: &str) -> Result<String>;
}
