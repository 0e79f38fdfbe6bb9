//! Collaborator traits for the retrieval-and-synthesis pipeline.
//!
//! The query service talks to its external collaborators only through these
//! traits, so each backend can be swapped (or faked in tests) independently:
//!
//! ```text
//!             ┌────────────────────┐
//!  query ───▶ │     RagService     │ ───▶ answer + citations
//!             └──┬───────┬──────┬──┘
//!                ▼       ▼      ▼
//!   EmbeddingProvider  WebSearch  ChatModel
//!   OpenAI / offline   Google CSE OpenAI
//! ```

use anyhow::Result;
use async_trait::async_trait;

use ius_civile_core::models::{ChatMessage, WebResult};

/// Maps texts to dense vectors, one per input, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-3-large"`, `"offline"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts. The result has exactly `texts.len()` vectors.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }
}

/// Single-shot chat completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Send `messages` and return the text of the first completion.
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;
}

/// Web search restricted to an allowlist of domains.
///
/// Implementations should return `Err` for transport or status failures;
/// the caller decides that such failures degrade to "no web results".
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, domains: &[&str]) -> Result<Vec<WebResult>>;
}
