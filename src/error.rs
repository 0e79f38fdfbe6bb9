//! Typed errors for the query path.
//!
//! Degraded conditions (no backend configured, web search failure, malformed
//! quiz output, missing index) never become errors; they are handled where
//! they occur. What remains here is what a caller must be told about.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request itself is unusable (e.g. empty query).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The embedding backend failed while embedding the query.
    #[error("retrieval unavailable: {0:#}")]
    RetrievalUnavailable(anyhow::Error),

    /// The generative backend failed while producing an answer or a quiz.
    #[error("generation unavailable: {0:#}")]
    GenerationUnavailable(anyhow::Error),
}

impl ServiceError {
    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidRequest(_) => "bad_request",
            ServiceError::RetrievalUnavailable(_) => "retrieval_unavailable",
            ServiceError::GenerationUnavailable(_) => "generation_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_messages() {
        let e = ServiceError::RetrievalUnavailable(anyhow::anyhow!("timeout"));
        assert_eq!(e.code(), "retrieval_unavailable");
        assert_eq!(e.to_string(), "retrieval unavailable: timeout");

        let e = ServiceError::InvalidRequest("query must not be empty".into());
        assert_eq!(e.code(), "bad_request");
    }
}
