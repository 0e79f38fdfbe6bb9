//! Embedding backends.
//!
//! - **[`OfflineEmbedder`]**: seeded pseudo-random vectors; used when no
//!   generative backend is configured so offline runs stay reproducible.
//! - **[`OpenAiEmbedder`]**: calls `POST {base}/embeddings` with batching,
//!   retry and backoff.
//!
//! Use [`create_embedder`] to pick the backend from [`Capabilities`].
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use ius_civile_core::embedding::offline_vectors;

use crate::config::{Capabilities, EmbeddingConfig, OpenAiCredentials};
use crate::traits::EmbeddingProvider;

/// Create the embedding backend matching the resolved capabilities.
pub fn create_embedder(
    config: &EmbeddingConfig,
    caps: &Capabilities,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match &caps.generative {
        Some(creds) => Ok(Arc::new(OpenAiEmbedder::new(config, creds.clone())?)),
        None => Ok(Arc::new(OfflineEmbedder::new(
            config.offline_seed,
            config.dims,
        ))),
    }
}

// ============ Offline Provider ============

/// Deterministic embedder for offline/demo mode.
///
/// Every call re-seeds the generator, so identical batches always produce
/// identical vectors. Vectors carry no semantics.
pub struct OfflineEmbedder {
    seed: u64,
    dims: usize,
}

impl OfflineEmbedder {
    pub fn new(seed: u64, dims: usize) -> Self {
        Self { seed, dims }
    }
}

#[async_trait]
impl EmbeddingProvider for OfflineEmbedder {
    fn model_name(&self) -> &str {
        "offline"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(offline_vectors(self.seed, texts.len(), self.dims))
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI embeddings API.
pub struct OpenAiEmbedder {
    model: String,
    batch_size: usize,
    max_retries: u32,
    credentials: OpenAiCredentials,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig, credentials: OpenAiCredentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build embedding HTTP client")?;
        Ok(Self {
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            credentials,
            client,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/embeddings", self.credentials.base_url);

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.credentials.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_openai_response(&json, texts.len());
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(%status, attempt, "embedding request failed, retrying");
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "embedding request failed, retrying");
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.embed_batch(batch).await?);
        }
        Ok(out)
    }
}

/// Parse an embeddings response, placing each vector by its `index` field.
///
/// The response order is not trusted. Every input position must be covered
/// exactly once, otherwise the whole batch is rejected.
fn parse_openai_response(json: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    if data.len() != expected {
        bail!(
            "Invalid OpenAI response: {} embeddings for {} inputs",
            data.len(),
            expected
        );
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];

    for item in data {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing index"))?
            as usize;
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;

        let slot = slots
            .get_mut(index)
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: index {} out of range", index))?;
        if slot.is_some() {
            bail!("Invalid OpenAI response: duplicate index {}", index);
        }

        *slot = Some(
            embedding
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect(),
        );
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing index {}", i)))
        .collect()
}
