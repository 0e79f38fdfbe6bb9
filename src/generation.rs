//! Chat completion backend (OpenAI-compatible `POST {base}/chat/completions`).
//!
//! One blocking call per request, no retry: a provider failure is reported to
//! the caller as-is.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use ius_civile_core::models::ChatMessage;

use crate::config::{Capabilities, GenerationConfig, OpenAiCredentials};
use crate::traits::ChatModel;

/// Create the chat backend, or `None` in offline mode.
pub fn create_chat_model(
    config: &GenerationConfig,
    caps: &Capabilities,
) -> Result<Option<Arc<dyn ChatModel>>> {
    match &caps.generative {
        Some(creds) => Ok(Some(Arc::new(OpenAiChat::new(config, creds.clone())?))),
        None => Ok(None),
    }
}

pub struct OpenAiChat {
    model: String,
    credentials: OpenAiCredentials,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: &GenerationConfig, credentials: OpenAiCredentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build chat HTTP client")?;
        Ok(Self {
            model: config.model.clone(),
            credentials,
            client,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature,
            messages,
        };
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.credentials.base_url))
            .bearer_auth(&self.credentials.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call chat completions")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("chat completions returned {}: {}", status, text);
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .context("failed to parse chat completions response")?;
        first_completion(parsed)
    }
}

fn first_completion(parsed: ChatResponse) -> Result<String> {
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| anyhow::anyhow!("chat completions returned no choices"))
}
