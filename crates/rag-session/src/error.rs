//! Error types for sessions.

use thiserror::Error;

use rag_channel::ChannelError;
use rag_embeddings::EmbeddingError;
use rag_types::RagError;

/// Errors surfaced by session operations.
///
/// Operations on a session that is not started never produce these; they
/// are silent no-ops.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Talking to the index process failed
    #[error("Index channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Tokenization, inference or pooling failed
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Input rejected before reaching the model
    #[error("Invalid input: {0}")]
    Input(#[from] RagError),
}

impl SessionError {
    /// Whether the session was torn down because of this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Channel(e) if e.is_fatal())
    }
}
