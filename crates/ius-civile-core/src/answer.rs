//! Deterministic answer used when no generative backend is configured.

/// Marker that opens every offline answer.
pub const OFFLINE_MARKER: &str = "Modalità offline (offline mode)";

/// Number of contexts and citations listed in an offline answer.
const OFFLINE_PREVIEW: usize = 3;

/// Build the offline answer: the marker, then the first three local contexts
/// and, if any, the first three web citations.
pub fn offline_answer(contexts: &[String], web_citations: &[String]) -> String {
    let mut answer = format!(
        "{}: indice locale attivo, ma nessun modello generativo configurato.\nContesto:",
        OFFLINE_MARKER
    );
    if contexts.is_empty() {
        answer.push_str(" nessun passaggio pertinente nell'indice locale.");
    } else {
        for ctx in contexts.iter().take(OFFLINE_PREVIEW) {
            answer.push_str("\n- ");
            answer.push_str(ctx);
        }
    }
    if !web_citations.is_empty() {
        answer.push_str("\n\nRiferimenti web:");
        for citation in web_citations.iter().take(OFFLINE_PREVIEW) {
            answer.push_str("\n- ");
            answer.push_str(citation);
        }
    }
    answer
}
