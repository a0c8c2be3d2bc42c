//! # rag-embeddings
//!
//! Text-to-vector pipeline for the retrieval bridge, built on Candle.
//!
//! - [`SegmentTokenizer`]: joins segments and produces fixed-length
//!   token ids + attention mask (512 by default)
//! - [`InferenceModel`] / [`CandleBert`]: last-hidden-state inference contract
//! - [`mean_pool`]: attention-masked mean over valid tokens
//! - [`chunk_text`]: token-bounded, non-overlapping document windows
//! - [`EmbeddingEngine`]: tokenize -> infer -> pool, with the dimension
//!   guard the index relies on
//! - Model file caching via HuggingFace Hub

pub mod cache;
pub mod candle;
pub mod chunker;
pub mod engine;
pub mod error;
pub mod model;
pub mod pooling;
pub mod tokenize;

pub use crate::candle::CandleBert;
pub use cache::{get_or_download_model, ModelCache, ModelPaths, MODEL_FILES};
pub use chunker::{chunk_text, TextChunk};
pub use engine::EmbeddingEngine;
pub use error::EmbeddingError;
pub use model::{
    DocumentEmbeddings, Embedder, Embedding, HiddenStates, InferenceModel, ModelInfo,
};
pub use pooling::mean_pool;
pub use tokenize::{SegmentTokenizer, TokenizedUnit};
