//! # Ius Civile
//!
//! A retrieval-augmented assistant for Italian civil law.
//!
//! Reference documents are chunked, embedded and stored in a flat vector
//! index. Queries are answered from the best-matching passages, optionally
//! augmented with web results restricted to official legal-publication
//! domains, and synthesized into an answer tailored to a professional
//! profile. The same backend also generates multiple-choice quizzes.
//!
//! Every external backend is optional. Without credentials the system runs
//! in a deterministic offline mode.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌─────────────────────┐
//! │  Documents  │──▶│   Pipeline   │──▶│ index.bin+meta.json │
//! │ PDF/TXT/MD  │   │ Chunk+Embed  │   └─────────┬───────────┘
//! └─────────────┘   └──────────────┘             │
//!                                                ▼
//!                     web search ──────▶ ┌──────────────┐
//!                     (allowlisted)      │  RagService  │──▶ answer + citations
//!                                        └──────┬───────┘
//!                                   ┌───────────┴──────────┐
//!                                   ▼                      ▼
//!                              ┌──────────┐          ┌──────────┐
//!                              │   CLI    │          │   HTTP   │
//!                              │  (ius)   │          │  (axum)  │
//!                              └──────────┘          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ius ingest ./docs/                       # build the index
//! ius ask "obbligazioni contrattuali"       # one question
//! ius serve                                 # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and capability resolution |
//! | [`error`] | Typed query-path errors |
//! | [`traits`] | Embedding, chat and web search collaborator traits |
//! | [`embedding`] | OpenAI and offline embedding backends |
//! | [`generation`] | OpenAI chat completion backend |
//! | [`web_search`] | Google Custom Search backend |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`sources`] | Ingest path discovery |
//! | [`store`] | Atomic index persistence |
//! | [`ingest`] | Ingestion pipeline |
//! | [`service`] | Hybrid retrieval, answers and quizzes |
//! | [`server`] | HTTP server |
//! | [`status`] | Index and backend overview |
//!
//! Pure logic (chunking, index, citations, prompts, quiz parsing) lives in
//! the `ius-civile-core` crate.

pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod server;
pub mod service;
pub mod sources;
pub mod status;
pub mod store;
pub mod traits;
pub mod web_search;
