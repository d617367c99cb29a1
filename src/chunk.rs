//! Fixed-window text chunker with overlap.
//!
//! Splits extracted document text into [`TextChunk`]s of at most
//! `max_size` characters. Each window starts `max_size - overlap`
//! characters after the previous one, so neighbors share exactly
//! `overlap` characters.
//!
//! Sizes count Unicode scalar values, not bytes, so a window never
//! splits a multi-byte character.
//!
//! # Example
//!
//! ```rust
//! use pdf_chat::chunk::chunk_text;
//!
//! let chunks = chunk_text("abcdefghij", 4, 1);
//! let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
//! assert_eq!(texts, ["abcd", "defg", "ghij"]);
//! ```

use crate::models::TextChunk;

/// Split text into overlapping windows.
///
/// Returns an empty vector for empty or whitespace-only text. `overlap`
/// is clamped below `max_size`; config validation rejects such values
/// before they get here.
pub fn chunk_text(text: &str, max_size: usize, overlap: usize) -> Vec<TextChunk> {
    if max_size == 0 || text.trim().is_empty() {
        return Vec::new();
    }
    let overlap = overlap.min(max_size - 1);
    let step = max_size - overlap;

    // Byte offset of every char, plus the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + max_size).min(char_len);
        chunks.push(TextChunk {
            index: chunks.len(),
            content: text[bounds[start]..bounds[end]].to_string(),
            source: None,
        });
        if end == char_len {
            break;
        }
        start += step;
    }
    chunks
}

/// Number of chunks [`chunk_text`] produces for a text of `len` characters.
pub fn expected_chunk_count(len: usize, max_size: usize, overlap: usize) -> usize {
    if len == 0 || max_size == 0 {
        return 0;
    }
    if len <= max_size {
        return 1;
    }
    let overlap = overlap.min(max_size - 1);
    let step = max_size - overlap;
    (len - overlap).div_ceil(step)
}
