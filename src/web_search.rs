//! Google Custom Search backend for allowlisted web augmentation.
//!
//! Issues one `GET {endpoint}?key=…&cx=…&q=…&num=…` per query under a bounded
//! timeout. Non-success statuses and transport errors are returned as `Err`;
//! the query service treats them as "no web results".

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use ius_civile_core::models::WebResult;
use ius_civile_core::retrieve::site_restricted_query;

use crate::config::{Capabilities, SearchCredentials, WebSearchConfig};
use crate::traits::WebSearch;

/// Create the web search backend, or `None` when it is not configured.
pub fn create_web_search(
    config: &WebSearchConfig,
    caps: &Capabilities,
) -> Result<Option<Arc<dyn WebSearch>>> {
    match &caps.web_search {
        Some(creds) => Ok(Some(Arc::new(GoogleCustomSearch::new(
            config,
            creds.clone(),
        )?))),
        None => Ok(None),
    }
}

pub struct GoogleCustomSearch {
    endpoint: String,
    num: u32,
    credentials: SearchCredentials,
    client: reqwest::Client,
}

impl GoogleCustomSearch {
    pub fn new(config: &WebSearchConfig, credentials: SearchCredentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build web search HTTP client")?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            num: config.num,
            credentials,
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<WebResult>,
}

#[async_trait]
impl WebSearch for GoogleCustomSearch {
    async fn search(&self, query: &str, domains: &[&str]) -> Result<Vec<WebResult>> {
        let q = site_restricted_query(query, domains);
        let num = self.num.to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.credentials.api_key.as_str()),
                ("cx", self.credentials.engine_id.as_str()),
                ("q", q.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .context("web search request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("web search returned {}", status);
        }

        let parsed: SearchResponse = resp
            .json()
            .await
            .context("failed to parse web search response")?;
        Ok(parsed.items)
    }
}
