//! Embedding and synthesis provider implementations.
//!
//! Concrete backends for the [`EmbeddingGenerator`] and [`AnswerSynthesizer`]
//! traits:
//! - **Disabled** — returns errors; used when a provider is not configured.
//! - **OpenAI** — `POST /v1/embeddings` and `POST /v1/chat/completions` with
//!   retry and backoff. Requires `OPENAI_API_KEY`.
//! - **Ollama** — a local Ollama instance's `/api/embed` and `/api/chat`
//!   endpoints.
//!
//! # Retry Strategy
//!
//! Both network backends use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use dossier_core::embedding::EmbeddingGenerator;
use dossier_core::synthesis::AnswerSynthesizer;

use crate::config::{EmbeddingConfig, SynthesisConfig};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Create the appropriate [`EmbeddingGenerator`] based on configuration.
pub fn create_embedding_generator(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedding)),
        "openai" => Ok(Box::new(OpenAiEmbedding::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbedding::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Create the appropriate [`AnswerSynthesizer`] based on configuration.
pub fn create_answer_synthesizer(config: &SynthesisConfig) -> Result<Box<dyn AnswerSynthesizer>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledSynthesis)),
        "openai" => Ok(Box::new(OpenAiSynthesis::new(config)?)),
        "ollama" => Ok(Box::new(OllamaSynthesis::new(config)?)),
        other => bail!("Unknown synthesis provider: {}", other),
    }
}

/// POST a JSON body with retry/backoff, returning the parsed response JSON.
///
/// `authorization` is attached as a bearer token when present.
async fn post_json_with_retry(
    url: &str,
    authorization: Option<&str>,
    body: &serde_json::Value,
    timeout_secs: u64,
    max_retries: u32,
) -> Result<serde_json::Value> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;

    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut req = client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(token) = authorization {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        match req.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!("API error {}: {}", status, body_text));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                bail!("API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
}

fn parse_f32_array(value: &serde_json::Value) -> Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("embedding is not an array"))?;
    Ok(arr
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

// ============ Disabled Providers ============

/// A no-op embedding generator that always returns errors.
pub struct DisabledEmbedding;

#[async_trait]
impl EmbeddingGenerator for DisabledEmbedding {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("Embedding provider is disabled")
    }
}

/// A no-op synthesizer that always returns errors.
pub struct DisabledSynthesis;

#[async_trait]
impl AnswerSynthesizer for DisabledSynthesis {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _system_instruction: &str, _user_prompt: &str) -> Result<String> {
        bail!("Synthesis provider is disabled")
    }
}

// ============ OpenAI ============

/// Embedding generator using the OpenAI embeddings API.
pub struct OpenAiEmbedding {
    model: String,
    dims: usize,
    timeout_secs: u64,
    max_retries: u32,
}

impl OpenAiEmbedding {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self {
            model,
            dims,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingGenerator for OpenAiEmbedding {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let json = post_json_with_retry(
            OPENAI_EMBEDDINGS_URL,
            Some(&api_key),
            &body,
            self.timeout_secs,
            self.max_retries,
        )
        .await?;

        let embedding = json
            .get("data")
            .and_then(|d| d.as_array())
            .and_then(|d| d.first())
            .and_then(|item| item.get("embedding"))
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;

        parse_f32_array(embedding)
    }
}

/// Answer synthesizer using the OpenAI chat completions API.
pub struct OpenAiSynthesis {
    model: String,
    max_completion_tokens: u32,
    temperature: f64,
    timeout_secs: u64,
    max_retries: u32,
}

impl OpenAiSynthesis {
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("synthesis.model required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self {
            model,
            max_completion_tokens: config.max_completion_tokens,
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl AnswerSynthesizer for OpenAiSynthesis {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system_instruction: &str, user_prompt: &str) -> Result<String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_instruction },
                { "role": "user", "content": user_prompt },
            ],
            "max_tokens": self.max_completion_tokens,
            "temperature": self.temperature,
        });

        let json = post_json_with_retry(
            OPENAI_CHAT_URL,
            Some(&api_key),
            &body,
            self.timeout_secs,
            self.max_retries,
        )
        .await?;

        let content = json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|choice| choice.pointer("/message/content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))?;

        Ok(content.to_string())
    }
}

// ============ Ollama ============

/// Embedding generator using a local Ollama instance.
pub struct OllamaEmbedding {
    model: String,
    dims: usize,
    url: String,
    timeout_secs: u64,
    max_retries: u32,
}

impl OllamaEmbedding {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            model,
            dims,
            url,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingGenerator for OllamaEmbedding {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let json = post_json_with_retry(
            &format!("{}/api/embed", self.url),
            None,
            &body,
            self.timeout_secs,
            self.max_retries,
        )
        .await
        .map_err(|e| anyhow::anyhow!("Ollama request failed (is Ollama running at {}?): {}", self.url, e))?;

        let embedding = json
            .get("embeddings")
            .and_then(|e| e.as_array())
            .and_then(|e| e.first())
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

        parse_f32_array(embedding)
    }
}

/// Answer synthesizer using a local Ollama instance's chat endpoint.
pub struct OllamaSynthesis {
    model: String,
    url: String,
    temperature: f64,
    timeout_secs: u64,
    max_retries: u32,
}

impl OllamaSynthesis {
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("synthesis.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            model,
            url,
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl AnswerSynthesizer for OllamaSynthesis {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system_instruction: &str, user_prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_instruction },
                { "role": "user", "content": user_prompt },
            ],
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        let json = post_json_with_retry(
            &format!("{}/api/chat", self.url),
            None,
            &body,
            self.timeout_secs,
            self.max_retries,
        )
        .await
        .map_err(|e| anyhow::anyhow!("Ollama request failed (is Ollama running at {}?): {}", self.url, e))?;

        let content = json
            .pointer("/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message content"))?;

        Ok(content.to_string())
    }
}
