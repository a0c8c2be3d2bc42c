//! Tokenize -> infer -> pool.
//!
//! [`EmbeddingEngine`] owns a tokenizer and an inference model and is the
//! only place that checks pooled vectors against the width the index
//! expects. Nothing downstream validates it again.

use tracing::{debug, info};

use rag_types::ModelSettings;

use crate::cache::{get_or_download_model, ModelCache};
use crate::candle::CandleBert;
use crate::chunker::{chunk_text, TextChunk};
use crate::error::EmbeddingError;
use crate::model::{Embedder, Embedding, InferenceModel, ModelInfo};
use crate::pooling::mean_pool;
use crate::tokenize::{SegmentTokenizer, TokenizedUnit};

/// Tokenizer + model pair producing mean-pooled embeddings.
pub struct EmbeddingEngine<M> {
    tokenizer: SegmentTokenizer,
    model: M,
    info: ModelInfo,
}

impl EmbeddingEngine<CandleBert> {
    /// Load tokenizer and weights for `settings`, downloading them if the
    /// cache is cold.
    pub fn load(settings: &ModelSettings) -> Result<Self, EmbeddingError> {
        let cache = ModelCache::from_settings(settings);
        let paths = get_or_download_model(&cache)?;

        let tokenizer =
            SegmentTokenizer::from_file(&paths.tokenizer, settings.max_sequence_length)?;
        let model = CandleBert::load(&paths.config, &paths.weights)?;

        info!(
            model = %settings.repo_id,
            dim = settings.dimension,
            max_seq = settings.max_sequence_length,
            "Embedding engine ready"
        );

        Ok(Self::new(
            tokenizer,
            model,
            ModelInfo {
                name: settings.repo_id.clone(),
                dimension: settings.dimension,
                max_sequence_length: settings.max_sequence_length,
            },
        ))
    }
}

impl<M: InferenceModel> EmbeddingEngine<M> {
    pub fn new(tokenizer: SegmentTokenizer, model: M, info: ModelInfo) -> Self {
        Self {
            tokenizer,
            model,
            info,
        }
    }

    pub fn tokenizer(&self) -> &SegmentTokenizer {
        &self.tokenizer
    }

    /// Join and tokenize segments into one fixed-length unit.
    pub fn tokenize<S: AsRef<str>>(
        &self,
        segments: &[S],
    ) -> Result<TokenizedUnit, EmbeddingError> {
        self.tokenizer.tokenize(segments)
    }

    /// Run inference on a tokenized unit and mean-pool the hidden state.
    pub fn embed(&self, unit: &TokenizedUnit) -> Result<Embedding, EmbeddingError> {
        let hidden = self.model.forward(unit)?.ok_or_else(|| {
            EmbeddingError::MissingOutput("last_hidden_state not returned".to_string())
        })?;

        if hidden.batch != 1 {
            return Err(EmbeddingError::ShapeMismatch(format!(
                "expected batch of 1, got {}",
                hidden.batch
            )));
        }

        let pooled = mean_pool(&hidden, &unit.attention_mask)?;
        if pooled.len() != self.info.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.info.dimension,
                actual: pooled.len(),
            });
        }

        debug!(
            tokens = unit.valid_tokens(),
            dim = pooled.len(),
            "Embedded unit"
        );

        Ok(Embedding::new(pooled))
    }
}

impl<M: InferenceModel> Embedder for EmbeddingEngine<M> {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed_segments(&self, segments: &[String]) -> Result<Embedding, EmbeddingError> {
        let unit = self.tokenize(segments)?;
        self.embed(&unit)
    }

    /// Chunk windows are capped so a chunk plus its special tokens still
    /// fits in one tokenized unit.
    fn chunk(&self, text: &str, max_tokens: usize) -> Result<Vec<TextChunk>, EmbeddingError> {
        let window = max_tokens.min(self.tokenizer.content_capacity());
        chunk_text(&self.tokenizer, text, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::model::HiddenStates;
    use crate::tokenize::tests::fixture_tokenizer;

    /// Hidden value at (t, h) is `input_id(t) + h`.
    struct IdEchoModel {
        hidden_size: usize,
        calls: Cell<usize>,
    }

    impl IdEchoModel {
        fn new(hidden_size: usize) -> Self {
            Self {
                hidden_size,
                calls: Cell::new(0),
            }
        }
    }

    impl InferenceModel for IdEchoModel {
        fn forward(&self, unit: &TokenizedUnit) -> Result<Option<HiddenStates>, EmbeddingError> {
            self.calls.set(self.calls.get() + 1);
            let data = unit
                .input_ids
                .iter()
                .flat_map(|&id| (0..self.hidden_size).map(move |h| id as f32 + h as f32))
                .collect();
            Ok(Some(HiddenStates::new(
                data,
                1,
                unit.len(),
                self.hidden_size,
            )))
        }
    }

    struct SilentModel;

    impl InferenceModel for SilentModel {
        fn forward(&self, _unit: &TokenizedUnit) -> Result<Option<HiddenStates>, EmbeddingError> {
            Ok(None)
        }
    }

    fn info(dimension: usize, max_sequence_length: usize) -> ModelInfo {
        ModelInfo {
            name: "fixture".to_string(),
            dimension,
            max_sequence_length,
        }
    }

    #[test]
    fn test_embed_pools_valid_tokens() {
        let engine = EmbeddingEngine::new(fixture_tokenizer(16), IdEchoModel::new(3), info(3, 16));
        let unit = engine.tokenize(&["hello"]).unwrap();
        // [CLS]=2 hello=4 [SEP]=3
        assert_eq!(&unit.input_ids[..3], &[2, 4, 3]);

        let embedding = engine.embed(&unit).unwrap();
        assert_eq!(embedding.values, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_padding_does_not_change_embedding() {
        let short = EmbeddingEngine::new(fixture_tokenizer(8), IdEchoModel::new(2), info(2, 8));
        let long = EmbeddingEngine::new(fixture_tokenizer(64), IdEchoModel::new(2), info(2, 64));

        let a = short.embed_segments(&["hello world".to_string()]).unwrap();
        let b = long.embed_segments(&["hello world".to_string()]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_output() {
        let engine = EmbeddingEngine::new(fixture_tokenizer(16), SilentModel, info(3, 16));
        let result = engine.embed_segments(&["hello".to_string()]);
        assert!(matches!(result, Err(EmbeddingError::MissingOutput(_))));
    }

    #[test]
    fn test_dimension_mismatch_is_caught() {
        let engine = EmbeddingEngine::new(fixture_tokenizer(16), IdEchoModel::new(4), info(384, 16));
        let result = engine.embed_segments(&["hello".to_string()]);
        assert!(matches!(
            result,
            Err(EmbeddingError::DimensionMismatch {
                expected: 384,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_embed_document_in_source_order() {
        let engine = EmbeddingEngine::new(fixture_tokenizer(6), IdEchoModel::new(1), info(1, 6));
        let text = "the quick brown fox jumps over the lazy dog";

        // Window is capped at 6 - 2 special tokens = 4
        let mut pending = engine.embed_document(text, 512).unwrap();
        assert_eq!(pending.len(), 3);
        assert_eq!(engine.model.calls.get(), 0);

        let (first, _) = pending.next().unwrap().unwrap();
        assert_eq!(first.text, "the quick brown fox");
        assert_eq!(engine.model.calls.get(), 1);

        let rest: Vec<_> = pending.collect::<Result<_, _>>().unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[1].0.text, "dog");
        assert_eq!(engine.model.calls.get(), 3);
    }

    #[test]
    fn test_embed_document_rejects_blank() {
        let engine = EmbeddingEngine::new(fixture_tokenizer(16), IdEchoModel::new(1), info(1, 16));
        assert!(matches!(
            engine.embed_document("  ", 512),
            Err(EmbeddingError::EmptyInput(_))
        ));
        assert_eq!(engine.model.calls.get(), 0);
    }
}
