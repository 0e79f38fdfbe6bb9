//! Core data models used throughout Ius Civile.
//!
//! These types represent the chunks, provenance records, web results, prompt
//! turns and quiz items that flow through the ingestion and query pipeline.

use serde::{Deserialize, Serialize};

/// A window of a source document's text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Base filename of the source document.
    pub source_id: String,
    pub text: String,
    /// 1-based position within the source document.
    pub ordinal: usize,
}

impl Chunk {
    /// Citation label for this chunk, e.g. `"codice.pdf — chunk 3"`.
    pub fn citation(&self) -> String {
        format!("{} — chunk {}", self.source_id, self.ordinal)
    }

    /// Provenance record persisted in the metadata sidecar.
    pub fn to_meta(&self) -> ChunkMeta {
        ChunkMeta {
            source: self.source_id.clone(),
            chunk: self.text.clone(),
            citation: self.citation(),
        }
    }
}

/// Per-chunk provenance, stored position-aligned with the index vectors.
///
/// The citation is computed once at ingestion time and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub source: String,
    pub chunk: String,
    pub citation: String,
}

/// A single web search hit. Produced per query, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Speaker of a prompt turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One `{role, content}` turn sent to the generative backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A multiple-choice quiz question. Generated per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    /// Exactly four answer options.
    pub options: Vec<String>,
    /// Index of the correct option, `0..=3`.
    #[serde(alias = "correctIndex")]
    pub correct_index: u8,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub references: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_label() {
        let chunk = Chunk {
            source_id: "codice_civile.pdf".to_string(),
            text: "Art. 1173".to_string(),
            ordinal: 3,
        };
        assert_eq!(chunk.citation(), "codice_civile.pdf — chunk 3");
        let meta = chunk.to_meta();
        assert_eq!(meta.source, "codice_civile.pdf");
        assert_eq!(meta.chunk, "Art. 1173");
        assert_eq!(meta.citation, "codice_civile.pdf — chunk 3");
    }

    #[test]
    fn test_quiz_item_accepts_camel_case_index() {
        let item: QuizItem = serde_json::from_str(
            r#"{"question":"Q","options":["a","b","c","d"],"correctIndex":2}"#,
        )
        .unwrap();
        assert_eq!(item.correct_index, 2);
        assert!(item.explanation.is_none());
        assert!(item.references.is_none());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::system("x")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"x"}"#);
    }
}
