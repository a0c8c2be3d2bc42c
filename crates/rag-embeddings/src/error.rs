//! Embedding error types.

use thiserror::Error;

/// Errors that can occur while tokenizing, embedding or chunking text.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Candle model error
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Tokenizer failed or produced unusable output
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Nothing left to embed after joining/trimming the input
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// The model did not return a last-hidden-state tensor
    #[error("Missing model output: {0}")]
    MissingOutput(String),

    /// Attention mask has no valid positions. Correct tokenization of
    /// non-empty text never produces this.
    #[error("No valid tokens in attention mask")]
    NoValidTokens,

    /// Hidden-state or mask shape disagrees with the tokenized unit
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Pooled vector width differs from what the index expects
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model file not found or unreadable
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    /// Download error
    #[error("Failed to download model: {0}")]
    Download(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
