//! Plain-text extraction for ingested documents.
//!
//! PDFs are extracted page by page. A page that fails to extract contributes
//! empty text instead of aborting the document. Plain text and Markdown files
//! are read as (lossy) UTF-8.

use std::path::Path;
use thiserror::Error;

/// Extraction error for a whole document.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported document type: '{0}'")]
    UnsupportedExtension(String),

    #[error("could not read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// File extensions the extractor understands (lowercase, without dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Extract the plain text of the document at `path`.
pub fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ExtractError::UnsupportedExtension(ext));
    }

    let bytes = std::fs::read(path)?;
    if ext == "pdf" {
        extract_pdf(&bytes)
    } else {
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Extract a PDF, joining pages with `\n`.
///
/// The fast path extracts all pages at once with `pdf-extract`. If that
/// fails (or panics on malformed input), the document is reopened with
/// `lopdf` and each page is extracted on its own, substituting empty text
/// for pages that fail.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let whole = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match whole {
        Ok(Ok(pages)) => Ok(pages.join("\n")),
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "whole-document PDF extraction failed, going page by page");
            extract_pdf_per_page(bytes)
        }
        Err(_) => {
            tracing::debug!("whole-document PDF extraction panicked, going page by page");
            extract_pdf_per_page(bytes)
        }
    }
}

fn extract_pdf_per_page(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let pages = doc
        .get_pages()
        .into_keys()
        .map(|page| (page, doc.extract_text(&[page])));
    Ok(join_pages(pages))
}

/// Join per-page results, using empty text for pages that failed.
fn join_pages<E: std::fmt::Display>(
    pages: impl Iterator<Item = (u32, Result<String, E>)>,
) -> String {
    pages
        .map(|(page, text)| match text {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(page, error = %e, "page extraction failed, using empty text");
                String::new()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
