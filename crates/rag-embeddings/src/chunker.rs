//! Token-bounded document chunking.
//!
//! The model's length limit is counted in tokens, so documents are split on
//! token boundaries rather than characters. Windows are contiguous and do
//! not overlap; each one is decoded back to text and embedded on its own.

use tracing::debug;

use crate::error::EmbeddingError;
use crate::tokenize::SegmentTokenizer;

/// One token-bounded slice of a longer document.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// Position in the source document (0-based)
    pub index: usize,
    /// Decoded text of this window
    pub text: String,
    /// Token ids of this window, without special tokens
    pub token_ids: Vec<u32>,
}

impl TextChunk {
    pub fn token_count(&self) -> usize {
        self.token_ids.len()
    }
}

/// Split `text` into windows of at most `max_tokens` tokens.
///
/// Produces `ceil(L / max_tokens)` chunks for a text of `L` tokens; only the
/// last one may be shorter.
pub fn chunk_text(
    tokenizer: &SegmentTokenizer,
    text: &str,
    max_tokens: usize,
) -> Result<Vec<TextChunk>, EmbeddingError> {
    if text.trim().is_empty() {
        return Err(EmbeddingError::EmptyInput(
            "cannot chunk blank text".to_string(),
        ));
    }
    if max_tokens == 0 {
        return Err(EmbeddingError::InvalidInput(
            "max_tokens must be > 0".to_string(),
        ));
    }

    let ids = tokenizer.token_ids(text)?;
    if ids.is_empty() {
        return Err(EmbeddingError::Tokenizer(
            "tokenizer returned no tokens".to_string(),
        ));
    }

    let chunks = ids
        .chunks(max_tokens)
        .enumerate()
        .map(|(index, window)| {
            Ok(TextChunk {
                index,
                text: tokenizer.decode(window)?,
                token_ids: window.to_vec(),
            })
        })
        .collect::<Result<Vec<_>, EmbeddingError>>()?;

    debug!(
        tokens = ids.len(),
        max_tokens = max_tokens,
        chunks = chunks.len(),
        "Chunked document"
    );

    Ok(chunks)
}
