//! Fixed-size overlapping window chunker.
//!
//! Splits extracted document text into windows of `size` characters whose
//! start offsets are `size - overlap` apart. The final window is truncated to
//! whatever text remains. Offsets count Unicode scalar values, never bytes, so
//! accented Italian text is never split inside a code point.
//!
//! # Example
//!
//! ```rust
//! use ius_civile_core::chunk::chunk_text;
//!
//! let windows = chunk_text("abcdefghij", 4, 1).unwrap();
//! assert_eq!(windows, vec!["abcd", "defg", "ghij", "j"]);
//! ```

use anyhow::{bail, Result};

use crate::models::Chunk;

/// Default window length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2400;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 300;

/// Validate a window configuration.
///
/// The step between windows is `size - overlap`; a non-positive step would
/// never advance, so it is rejected up front.
pub fn validate_window(size: usize, overlap: usize) -> Result<()> {
    if size == 0 {
        bail!("chunk size must be > 0");
    }
    if overlap >= size {
        bail!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap,
            size
        );
    }
    Ok(())
}

/// Split `text` into overlapping windows.
///
/// Returns zero windows for empty input and `ceil(len / (size - overlap))`
/// windows otherwise.
///
/// # Errors
///
/// Fails immediately when `overlap >= size` or `size == 0`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    validate_window(size, overlap)?;
    let step = size - overlap;

    let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let char_len = offsets.len();
    offsets.push(text.len());

    let mut windows = Vec::with_capacity(char_len.div_ceil(step));
    let mut start = 0;
    while start < char_len {
        let end = (start + size).min(char_len);
        windows.push(text[offsets[start]..offsets[end]].to_string());
        start += step;
    }

    Ok(windows)
}

/// Chunk one document into [`Chunk`]s with 1-based ordinals.
pub fn chunk_document(
    source_id: &str,
    text: &str,
    size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    Ok(chunk_text(text, size, overlap)?
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            source_id: source_id.to_string(),
            text,
            ordinal: i + 1,
        })
        .collect())
}
