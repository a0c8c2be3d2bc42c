//! Limits applied to extracted document text before it is chunked.
//!
//! Text extraction (plain text, spreadsheets, word processors) happens
//! upstream; this module only sees the resulting blob.

use crate::error::RagError;

/// Largest document accepted for indexing, in characters.
pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 50_000;

/// Trim extracted text and check it against the size limit.
///
/// Returns the trimmed slice, or `RagError::InvalidInput` when the text is
/// blank or longer than `max_chars` characters.
pub fn normalize_document_text(text: &str, max_chars: usize) -> Result<&str, RagError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RagError::InvalidInput(
            "document contains no readable text".to_string(),
        ));
    }

    let chars = trimmed.chars().count();
    if chars > max_chars {
        return Err(RagError::InvalidInput(format!(
            "document too long for indexing: {} chars (limit {})",
            chars, max_chars
        )));
    }

    Ok(trimmed)
}
