//! # Ius Civile Core
//!
//! Pure retrieval-and-synthesis logic for Ius Civile: data models, chunking,
//! the in-memory vector index, citation normalization, profile-aware prompt
//! construction, quiz parsing and the deterministic offline fallbacks.
//!
//! This crate performs no network or filesystem I/O. The `ius-civile`
//! application crate supplies the embedding, generation and web search
//! backends and persists the index.

pub mod answer;
pub mod chunk;
pub mod citation;
pub mod embedding;
pub mod index;
pub mod models;
pub mod prompt;
pub mod quiz;
pub mod retrieve;
