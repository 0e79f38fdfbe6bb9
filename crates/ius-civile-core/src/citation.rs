//! Turns raw web search results into short, bounded citation strings.

use crate::models::WebResult;

/// Maximum length, in characters, of the title + snippet part of a citation.
pub const MAX_CITATION_CHARS: usize = 160;

/// Separator placed between a citation and its link.
pub const LINK_SEPARATOR: &str = " — ";

/// Join title and snippet, trim, and truncate to [`MAX_CITATION_CHARS`].
pub fn normalize_citation(title: &str, snippet: &str) -> String {
    let joined = format!("{} {}", title, snippet);
    joined.trim().chars().take(MAX_CITATION_CHARS).collect()
}

/// Citation for one web result, with its link appended when `show_links`
/// is set and the result has one. The link itself is never truncated.
pub fn cite_web_result(result: &WebResult, show_links: bool) -> String {
    let citation = normalize_citation(&result.title, &result.snippet);
    if show_links && !result.link.is_empty() {
        format!("{}{}{}", citation, LINK_SEPARATOR, result.link)
    } else {
        citation
    }
}
