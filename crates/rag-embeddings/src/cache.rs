//! Local cache of model files fetched from HuggingFace Hub.
//!
//! Layout: `<cache_dir>/<repo_id with '/' replaced by '_'>/<file>`.
//! A file counts as cached only when it exists and is non-empty; downloads
//! land in a `.part` file first and are renamed into place, so an
//! interrupted fetch is retried on the next run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use rag_types::ModelSettings;

use crate::error::EmbeddingError;

/// Files an encoder needs: architecture, vocabulary, weights.
pub const MODEL_FILES: &[&str] = &["config.json", "tokenizer.json", "model.safetensors"];

/// Where one model's files live on disk.
#[derive(Debug, Clone)]
pub struct ModelCache {
    pub cache_dir: PathBuf,
    pub repo_id: String,
}

/// Resolved paths of a fully cached model.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelCache {
    pub fn new(cache_dir: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            repo_id: repo_id.into(),
        }
    }

    pub fn from_settings(settings: &ModelSettings) -> Self {
        Self::new(&settings.cache_dir, &settings.repo_id)
    }

    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(self.repo_id.replace('/', "_"))
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.model_dir().join(filename)
    }

    /// Required files that are absent or empty.
    pub fn missing_files(&self) -> Vec<&'static str> {
        MODEL_FILES
            .iter()
            .copied()
            .filter(|f| !is_complete(&self.file_path(f)))
            .collect()
    }

    pub fn is_cached(&self) -> bool {
        self.missing_files().is_empty()
    }

    pub fn paths(&self) -> ModelPaths {
        ModelPaths {
            config: self.file_path("config.json"),
            tokenizer: self.file_path("tokenizer.json"),
            weights: self.file_path("model.safetensors"),
        }
    }
}

fn is_complete(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Return the model's file paths, downloading whatever is missing.
pub fn get_or_download_model(cache: &ModelCache) -> Result<ModelPaths, EmbeddingError> {
    let missing = cache.missing_files();
    if missing.is_empty() {
        debug!(path = ?cache.model_dir(), "Using cached model");
    } else {
        info!(repo = %cache.repo_id, files = ?missing, "Downloading model files...");
        download_files(cache, &missing)?;
    }
    Ok(cache.paths())
}

fn download_files(cache: &ModelCache, files: &[&str]) -> Result<(), EmbeddingError> {
    use hf_hub::api::sync::Api;

    let api = Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
    let repo = api.model(cache.repo_id.clone());
    fs::create_dir_all(cache.model_dir())?;

    for &filename in files {
        let fetched = repo
            .get(filename)
            .map_err(|e| EmbeddingError::Download(format!("{}: {}", filename, e)))?;

        let dest = cache.file_path(filename);
        let partial = dest.with_extension("part");
        fs::copy(&fetched, &partial)?;
        fs::rename(&partial, &dest)?;
        debug!(file = filename, dest = ?dest, "Cached");
    }
    Ok(())
}
