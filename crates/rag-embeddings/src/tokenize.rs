//! Tokenizer adaptation.
//!
//! Wraps a HuggingFace `tokenizers::Tokenizer` and produces fixed-length
//! units: ids and mask are always exactly `max_length` long, truncated or
//! padded as needed.
//!
//! Any truncation or padding stored in `tokenizer.json` is dropped on load
//! (sentence-transformers exports ship `Fixed(128)`); length is governed by
//! `max_length` alone.

use std::path::Path;

use tokenizers::{PostProcessor, Tokenizer, TruncationDirection};
use tracing::trace;

use crate::error::EmbeddingError;

/// Token ids and attention mask for one embeddable unit.
#[derive(Debug, Clone)]
pub struct TokenizedUnit {
    /// Source text after joining segments
    pub text: String,
    pub input_ids: Vec<u32>,
    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<u32>,
}

impl TokenizedUnit {
    /// Padded sequence length
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of non-padding positions
    pub fn valid_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

/// Tokenizer producing fixed-length [`TokenizedUnit`]s.
pub struct SegmentTokenizer {
    tokenizer: Tokenizer,
    max_length: usize,
    pad_id: u32,
}

impl SegmentTokenizer {
    /// Wrap an already-built tokenizer, clearing its own truncation and
    /// padding settings.
    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self, EmbeddingError> {
        if max_length == 0 {
            return Err(EmbeddingError::InvalidInput(
                "max_length must be > 0".to_string(),
            ));
        }

        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| tokenizer.token_to_id("[PAD]"))
            .unwrap_or(0);

        tokenizer
            .with_truncation(None)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(None);

        Ok(Self {
            tokenizer,
            max_length,
            pad_id,
        })
    }

    /// Load `tokenizer.json` from disk.
    pub fn from_file(path: &Path, max_length: usize) -> Result<Self, EmbeddingError> {
        let tokenizer =
            Tokenizer::from_file(path).map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;
        Self::new(tokenizer, max_length)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Tokens left for content once special tokens are added to a single
    /// sequence.
    pub fn content_capacity(&self) -> usize {
        let special = self
            .tokenizer
            .get_post_processor()
            .map(|p| p.added_tokens(false))
            .unwrap_or(0);
        self.max_length.saturating_sub(special).max(1)
    }

    /// Join segments with single spaces and tokenize to `max_length`.
    pub fn tokenize<S: AsRef<str>>(
        &self,
        segments: &[S],
    ) -> Result<TokenizedUnit, EmbeddingError> {
        let joined = segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        let text = joined.trim();

        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput(
                "no text to tokenize after joining segments".to_string(),
            ));
        }

        // Truncate the content, then add [CLS]/[SEP] so they always survive
        let mut encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;
        let capacity = self.content_capacity();
        if encoding.len() > capacity {
            trace!(
                tokens = encoding.len(),
                max = capacity,
                "Truncating tokenized unit"
            );
            encoding.truncate(capacity, 0, TruncationDirection::Right);
        }
        let encoding = self
            .tokenizer
            .post_process(encoding, None, true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let ids = encoding.get_ids();
        let mask = encoding.get_attention_mask();
        if ids.is_empty() || !mask.iter().any(|&m| m == 1) {
            return Err(EmbeddingError::Tokenizer(
                "tokenizer produced no tokens".to_string(),
            ));
        }

        // Only shorter than the special tokens themselves when max_length < 3
        let len = ids.len().min(self.max_length);
        let mut input_ids = ids[..len].to_vec();
        let mut attention_mask = mask[..len].to_vec();
        input_ids.resize(self.max_length, self.pad_id);
        attention_mask.resize(self.max_length, 0);

        Ok(TokenizedUnit {
            text: text.to_string(),
            input_ids,
            attention_mask,
        })
    }

    /// Token ids of `text` without special tokens, no padding or truncation.
    pub fn token_ids(&self, text: &str) -> Result<Vec<u32>, EmbeddingError> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Decode ids back to text, skipping special tokens.
    pub fn decode(&self, ids: &[u32]) -> Result<String, EmbeddingError> {
        self.tokenizer
            .decode(ids, true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))
    }
}
