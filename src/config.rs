//! TOML configuration and backend capability resolution.
//!
//! Tunables (data directory, chunk window, retrieval bounds, model names,
//! timeouts, bind address) come from an optional TOML file. Secrets come only
//! from the environment and are resolved exactly once into [`Capabilities`],
//! which every component receives instead of re-reading the environment.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use ius_civile_core::chunk::{validate_window, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
    #[serde(default = "default_max_citations")]
    pub max_citations: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            max_citations: default_max_citations(),
        }
    }
}

fn default_top_k() -> usize {
    8
}
fn default_max_top_k() -> usize {
    50
}
fn default_max_citations() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Width of offline vectors. Backend vectors take whatever width the
    /// model returns.
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_offline_seed")]
    pub offline_seed: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
            offline_seed: default_offline_seed(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    3
}
fn default_embedding_timeout_secs() -> u64 {
    60
}
fn default_offline_seed() -> u64 {
    42
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_chat_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_generation_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_num")]
    pub num: u32,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            num: default_search_num(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}
fn default_search_num() -> u32 {
    10
}
fn default_search_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Path of the binary vector index file.
    pub fn index_path(&self) -> PathBuf {
        self.data.dir.join("index.bin")
    }

    /// Path of the JSON metadata sidecar.
    pub fn meta_path(&self) -> PathBuf {
        self.data.dir.join("meta.json")
    }

    /// Path of the ingestion lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.data.dir.join(".ingest.lock")
    }

    /// Check invariants that would otherwise surface deep inside a run.
    pub fn validate(&self) -> Result<()> {
        validate_window(self.chunking.size, self.chunking.overlap)
            .context("invalid [chunking] section")?;

        if self.retrieval.max_top_k == 0 {
            bail!("retrieval.max_top_k must be >= 1");
        }
        if self.embedding.dims == 0 {
            bail!("embedding.dims must be > 0");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            bail!("generation.temperature must be in [0.0, 2.0]");
        }
        if !(1..=10).contains(&self.web_search.num) {
            bail!("web_search.num must be in 1..=10");
        }
        Ok(())
    }

    /// Apply the non-secret environment overrides
    /// (`IUS_DATA`, `IUS_EMB_MODEL`, `IUS_CHAT_MODEL`).
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = env_non_empty("IUS_DATA") {
            self.data.dir = PathBuf::from(dir);
        }
        if let Some(model) = env_non_empty("IUS_EMB_MODEL") {
            self.embedding.model = model;
        }
        if let Some(model) = env_non_empty("IUS_CHAT_MODEL") {
            self.generation.model = model;
        }
    }
}

/// Load configuration from `path`, falling back to [`Config::minimal`] when
/// the file does not exist, then apply environment overrides and validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Config::minimal()
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Credentials for the OpenAI-compatible embedding and chat backend.
#[derive(Debug, Clone)]
pub struct OpenAiCredentials {
    pub api_key: String,
    pub base_url: String,
}

/// Credentials for the Google Custom Search backend.
#[derive(Debug, Clone)]
pub struct SearchCredentials {
    pub api_key: String,
    pub engine_id: String,
}

/// Which external backends are available for this process.
///
/// A missing backend is a supported mode, not an error: without a generative
/// backend everything runs on deterministic offline fallbacks, and without a
/// search backend web augmentation is skipped.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub generative: Option<OpenAiCredentials>,
    pub web_search: Option<SearchCredentials>,
}

impl Capabilities {
    /// Offline: no backend of any kind.
    pub fn offline() -> Self {
        Self::default()
    }

    /// Resolve capabilities from `OPENAI_API_KEY`, `OPENAI_BASE_URL`,
    /// `GOOGLE_API_KEY` and `GOOGLE_CX`.
    pub fn from_env() -> Self {
        let generative = env_non_empty("OPENAI_API_KEY").map(|api_key| OpenAiCredentials {
            api_key,
            base_url: env_non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
        });
        let web_search = match (env_non_empty("GOOGLE_API_KEY"), env_non_empty("GOOGLE_CX")) {
            (Some(api_key), Some(engine_id)) => Some(SearchCredentials { api_key, engine_id }),
            _ => None,
        };
        Self {
            generative,
            web_search,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.generative.is_none()
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
