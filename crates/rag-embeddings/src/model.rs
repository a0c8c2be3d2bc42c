//! Embedding types and the traits at the model boundary.
//!
//! [`InferenceModel`] is the fixed inference contract: token ids plus an
//! attention mask go in, a `[batch × sequence × hidden]` tensor comes out.
//! [`Embedder`] is what sessions talk to: text in, one vector per unit out.

use crate::chunker::TextChunk;
use crate::error::EmbeddingError;
use crate::tokenize::TokenizedUnit;

/// One pooled vector per text unit.
///
/// Values are the raw arithmetic mean over valid tokens; no normalization
/// is applied because the index compares vectors as they were produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name (e.g., "sentence-transformers/all-MiniLM-L6-v2")
    pub name: String,
    /// Embedding dimension the index expects
    pub dimension: usize,
    /// Fixed token length of every tokenized unit
    pub max_sequence_length: usize,
}

/// Last hidden state returned by a model, flattened row-major.
#[derive(Debug, Clone)]
pub struct HiddenStates {
    pub data: Vec<f32>,
    pub batch: usize,
    pub seq_len: usize,
    pub hidden_size: usize,
}

impl HiddenStates {
    pub fn new(data: Vec<f32>, batch: usize, seq_len: usize, hidden_size: usize) -> Self {
        Self {
            data,
            batch,
            seq_len,
            hidden_size,
        }
    }

    /// Hidden vector at `(batch, position)`.
    pub fn row(&self, batch: usize, position: usize) -> &[f32] {
        let start = (batch * self.seq_len + position) * self.hidden_size;
        &self.data[start..start + self.hidden_size]
    }
}

/// Inference contract for a transformer encoder.
///
/// Implementations receive the unit's token ids and attention mask (segment
/// ids are always zero) and return the last hidden state, or `None` when the
/// model produced no such output.
pub trait InferenceModel: Send {
    fn forward(&self, unit: &TokenizedUnit) -> Result<Option<HiddenStates>, EmbeddingError>;
}

/// Text-to-vector interface used by sessions.
pub trait Embedder: Send {
    /// Get model information
    fn info(&self) -> &ModelInfo;

    /// Join `segments` with single spaces and embed them as one unit.
    fn embed_segments(&self, segments: &[String]) -> Result<Embedding, EmbeddingError>;

    /// Split `text` into token-bounded chunks of at most `max_tokens`.
    fn chunk(&self, text: &str, max_tokens: usize) -> Result<Vec<TextChunk>, EmbeddingError>;

    /// Chunk a document; the returned iterator embeds each chunk in source
    /// order as it is advanced.
    ///
    /// Callers stop at the first `Err`, so later chunks are never embedded.
    fn embed_document(
        &self,
        text: &str,
        max_tokens: usize,
    ) -> Result<DocumentEmbeddings<'_, Self>, EmbeddingError> {
        let chunks = self.chunk(text, max_tokens)?;
        Ok(DocumentEmbeddings {
            embedder: self,
            chunks: chunks.into_iter(),
        })
    }
}

/// Lazily embedded chunks of one document, from [`Embedder::embed_document`].
pub struct DocumentEmbeddings<'a, E: ?Sized> {
    embedder: &'a E,
    chunks: std::vec::IntoIter<TextChunk>,
}

impl<E: Embedder + ?Sized> Iterator for DocumentEmbeddings<'_, E> {
    type Item = Result<(TextChunk, Embedding), EmbeddingError>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        Some(
            self.embedder
                .embed_segments(std::slice::from_ref(&chunk.text))
                .map(|embedding| (chunk, embedding)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl<E: Embedder + ?Sized> ExactSizeIterator for DocumentEmbeddings<'_, E> {}
