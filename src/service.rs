//! Query service: hybrid retrieval, answer synthesis and quiz generation.
//!
//! [`RagService`] owns the read-only index loaded at startup and the
//! backends resolved from [`Capabilities`]. It is shared behind an `Arc`
//! by the HTTP server and used directly by the CLI.
//!
//! # Degradation
//!
//! | Condition | Effect |
//! |-----------|--------|
//! | no generative backend | offline answer / demonstrative quiz item |
//! | no search backend, search error or timeout | no web citations |
//! | no index, or an unusable one | no local contexts |
//! | malformed quiz completion | single placeholder item |
//! | query embedding fails | [`ServiceError::RetrievalUnavailable`] |
//! | chat completion fails | [`ServiceError::GenerationUnavailable`] |

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ius_civile_core::answer::offline_answer;
use ius_civile_core::citation::cite_web_result;
use ius_civile_core::index::{LocalHit, VectorIndex};
use ius_civile_core::models::{QuizItem, WebResult};
use ius_civile_core::prompt::{build_prompt, Profile};
use ius_civile_core::quiz::{demo_item, items_or_fallback, quiz_messages};
use ius_civile_core::retrieve::{wants_web, ALLOWLIST};

use crate::config::{Capabilities, Config};
use crate::embedding::create_embedder;
use crate::error::ServiceError;
use crate::generation::create_chat_model;
use crate::store::load_index;
use crate::traits::{ChatModel, EmbeddingProvider, WebSearch};
use crate::web_search::create_web_search;

/// Upper bound on quiz items per request.
pub const MAX_QUIZ_ITEMS: usize = 20;

/// A prior conversation turn. Accepted on the wire, not used for retrieval.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryTurn {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// Request body for `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default = "default_true", alias = "showLinks")]
    pub show_links: bool,
    #[serde(default = "default_true", alias = "forceWebForCases")]
    pub force_web_for_cases: bool,
    #[serde(default, alias = "topK")]
    pub top_k: Option<usize>,
}

impl ChatRequest {
    /// Request with the wire defaults.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
            profile: Profile::default(),
            show_links: true,
            force_web_for_cases: true,
            top_k: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Response body for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    /// Web citations only, at most `retrieval.max_citations`.
    pub citations: Vec<String>,
}

/// Request body for `POST /quiz`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizRequest {
    pub topic: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_num")]
    pub num: usize,
}

impl QuizRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            difficulty: default_difficulty(),
            num: default_num(),
        }
    }
}

fn default_difficulty() -> String {
    "medio".to_string()
}

fn default_num() -> usize {
    5
}

/// Response body for `POST /quiz`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResponse {
    pub items: Vec<QuizItem>,
}

pub struct RagService {
    config: Config,
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Option<Arc<dyn ChatModel>>,
    web: Option<Arc<dyn WebSearch>>,
}

impl RagService {
    /// Build the service from configuration, loading the persisted index.
    ///
    /// An unusable index is logged and replaced by an empty one, so queries
    /// still run (web-only or offline).
    pub fn from_config(config: Config, caps: &Capabilities) -> anyhow::Result<Self> {
        let index = match load_index(&config) {
            Ok(Some(index)) => {
                tracing::info!(chunks = index.len(), dims = index.dims(), "index loaded");
                index
            }
            Ok(None) => {
                tracing::info!(dir = %config.data.dir.display(), "no index yet, local retrieval disabled");
                VectorIndex::new(config.embedding.dims)
            }
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "persisted index unusable, local retrieval disabled");
                VectorIndex::new(config.embedding.dims)
            }
        };

        let embedder = create_embedder(&config.embedding, caps)?;
        let chat = create_chat_model(&config.generation, caps)?;
        let web = create_web_search(&config.web_search, caps)?;
        Ok(Self::with_collaborators(config, index, embedder, chat, web))
    }

    /// Build the service from explicit parts.
    pub fn with_collaborators(
        config: Config,
        index: VectorIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Option<Arc<dyn ChatModel>>,
        web: Option<Arc<dyn WebSearch>>,
    ) -> Self {
        Self {
            config,
            index: Arc::new(index),
            embedder,
            chat,
            web,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn is_generative(&self) -> bool {
        self.chat.is_some()
    }

    pub fn has_web_search(&self) -> bool {
        self.web.is_some()
    }

    /// Answer one query with cited context.
    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ServiceError> {
        let query = req.query.trim();
        if query.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        if !req.history.is_empty() {
            tracing::debug!(turns = req.history.len(), "ignoring chat history");
        }

        let top_k = req
            .top_k
            .unwrap_or(self.config.retrieval.top_k)
            .min(self.config.retrieval.max_top_k);

        let hits = self.search_local(query, top_k).await?;
        let contexts: Vec<String> = hits.into_iter().map(|h| h.meta.chunk).collect();

        let web_results = if wants_web(query, req.force_web_for_cases) {
            self.search_web(query).await
        } else {
            Vec::new()
        };
        let web_citations: Vec<String> = web_results
            .iter()
            .map(|r| cite_web_result(r, req.show_links))
            .collect();

        tracing::debug!(
            contexts = contexts.len(),
            web = web_citations.len(),
            profile = req.profile.as_str(),
            "retrieval done"
        );

        let citations: Vec<String> = web_citations
            .iter()
            .take(self.config.retrieval.max_citations)
            .cloned()
            .collect();

        let Some(chat) = &self.chat else {
            return Ok(ChatResponse {
                answer: offline_answer(&contexts, &web_citations),
                citations,
            });
        };

        let prompt_citations: &[String] = if req.show_links {
            &web_citations
        } else {
            &[]
        };
        let messages = build_prompt(req.profile, query, &contexts, prompt_citations);
        let answer = chat
            .complete(&messages, self.config.generation.temperature)
            .await
            .map_err(ServiceError::GenerationUnavailable)?;

        Ok(ChatResponse { answer, citations })
    }

    /// Generate multiple-choice quiz items on `req.topic`.
    pub async fn quiz(&self, req: QuizRequest) -> Result<QuizResponse, ServiceError> {
        let topic = req.topic.trim();
        if topic.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "topic must not be empty".to_string(),
            ));
        }

        let Some(chat) = &self.chat else {
            return Ok(QuizResponse {
                items: vec![demo_item()],
            });
        };

        let num = req.num.clamp(1, MAX_QUIZ_ITEMS);
        let messages = quiz_messages(topic, req.difficulty.trim(), num);
        let raw = chat
            .complete(&messages, self.config.generation.temperature)
            .await
            .map_err(ServiceError::GenerationUnavailable)?;

        let (items, rejection) = items_or_fallback(&raw);
        if let Some(rejection) = rejection {
            tracing::warn!(%rejection, "quiz completion rejected, returning placeholder");
        }
        Ok(QuizResponse { items })
    }

    async fn search_local(&self, query: &str, top_k: usize) -> Result<Vec<LocalHit>, ServiceError> {
        if self.index.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed_one(query)
            .await
            .map_err(ServiceError::RetrievalUnavailable)?;

        match self.index.search_with_meta(&vector, top_k) {
            Ok(hits) => Ok(hits),
            Err(e) => {
                // Index built with a different embedding model.
                tracing::warn!(error = %e, "local search failed, continuing without local hits");
                Ok(Vec::new())
            }
        }
    }

    async fn search_web(&self, query: &str) -> Vec<WebResult> {
        let Some(web) = &self.web else {
            return Vec::new();
        };
        match web.search(query, ALLOWLIST).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "web search failed, continuing without web results");
                Vec::new()
            }
        }
    }
}
