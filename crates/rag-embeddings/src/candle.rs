//! Candle-based BERT encoder.
//!
//! Runs a BERT-family sentence encoder (all-MiniLM-L6-v2 by default) on CPU
//! and exposes its last hidden state through [`InferenceModel`].

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tracing::{debug, info};

use crate::error::EmbeddingError;
use crate::model::{HiddenStates, InferenceModel};
use crate::tokenize::TokenizedUnit;

/// BERT encoder loaded from safetensors.
pub struct CandleBert {
    model: BertModel,
    device: Device,
}

impl CandleBert {
    /// Load from explicit file paths
    pub fn load(config_path: &Path, weights_path: &Path) -> Result<Self, EmbeddingError> {
        info!(weights = ?weights_path, "Loading embedding model...");

        // CPU only; inference runs inline on the caller's task
        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(config_path)?;
        let config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.to_path_buf()], DType::F32, &device)?
        };

        let model = BertModel::load(vb, &config)?;

        info!("Model loaded successfully");

        Ok(Self { model, device })
    }
}

impl InferenceModel for CandleBert {
    fn forward(&self, unit: &TokenizedUnit) -> Result<Option<HiddenStates>, EmbeddingError> {
        let seq_len = unit.len();

        let input_ids = Tensor::from_vec(unit.input_ids.clone(), (1, seq_len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(unit.attention_mask.clone(), (1, seq_len), &self.device)?;
        let token_type_ids = Tensor::zeros_like(&input_ids)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let (batch, seq, hidden) = match output.dims3() {
            Ok(dims) => dims,
            Err(e) => {
                debug!(error = %e, "Model output is not a 3-d hidden state");
                return Ok(None);
            }
        };

        let data: Vec<f32> = output
            .to_dtype(DType::F32)?
            .flatten_all()?
            .to_vec1()?;

        Ok(Some(HiddenStates::new(data, batch, seq, hidden)))
    }
}
