//! PDF text extraction.
//!
//! Opens a PDF from memory, walks its pages in page-number order and joins
//! each page's text with a single newline. Extraction never panics: a
//! document that cannot be parsed returns [`ExtractionError`] and the
//! ingestion pipeline skips it.

use lopdf::Document;

use crate::error::ExtractionError;

/// Extract the text of every page, in order, separated by `\n`.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    // BTreeMap keyed by page number, so iteration is already in page order.
    let pages = doc.get_pages();
    let mut texts = Vec::with_capacity(pages.len());
    for page in pages.keys() {
        let text = doc
            .extract_text(&[*page])
            .map_err(|e| ExtractionError::Page {
                page: *page,
                message: e.to_string(),
            })?;
        texts.push(text.trim_end_matches(['\n', '\r']).to_string());
    }
    Ok(texts.join("\n"))
}
