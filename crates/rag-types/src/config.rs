//! Configuration loading for the retrieval bridge.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<config dir>/rag-bridge/config.toml`.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::document::DEFAULT_MAX_DOCUMENT_CHARS;
use crate::error::RagError;

const APP_NAME: &str = "rag-bridge";

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// HuggingFace repository holding config.json, tokenizer.json and
    /// model.safetensors.
    #[serde(default = "default_repo_id")]
    pub repo_id: String,

    /// Local model cache directory.
    #[serde(default = "default_model_cache_dir")]
    pub cache_dir: String,

    /// Fixed token length every tokenized unit is padded/truncated to.
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,

    /// Width of the pooled vector. Must match what the index process expects.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_repo_id() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_model_cache_dir() -> String {
    ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.cache_dir().join("models"))
        .unwrap_or_else(|| PathBuf::from(".cache/models"))
        .to_string_lossy()
        .to_string()
}

fn default_max_sequence_length() -> usize {
    512
}

fn default_dimension() -> usize {
    384
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            repo_id: default_repo_id(),
            cache_dir: default_model_cache_dir(),
            max_sequence_length: default_max_sequence_length(),
            dimension: default_dimension(),
        }
    }
}

/// Buffering and shutdown policy shared by every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Number of buffered segments that triggers a batched push.
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,

    /// How long `stop` waits for the index process before killing it (ms).
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Largest document accepted by `push_document`, in characters.
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
}

fn default_flush_threshold() -> usize {
    25
}

fn default_shutdown_grace_ms() -> u64 {
    3000
}

fn default_max_document_chars() -> usize {
    DEFAULT_MAX_DOCUMENT_CHARS
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            flush_threshold: default_flush_threshold(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            max_document_chars: default_max_document_chars(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the external vector-index executable
    #[serde(default = "default_index_executable")]
    pub index_executable: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Embedding model configuration
    #[serde(default)]
    pub model: ModelSettings,

    /// Session buffering/shutdown policy
    #[serde(default)]
    pub session: SessionSettings,
}

fn default_index_executable() -> String {
    "vector-index".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_executable: default_index_executable(),
            log_level: default_log_level(),
            model: ModelSettings::default(),
            session: SessionSettings::default(),
        }
    }
}

/// Everything one session needs, resolved from [`Settings`].
///
/// Each session gets its own copy; nothing here is shared between the
/// live-transcript session and the documents session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name used in log output ("live", "documents", ...)
    pub name: String,
    /// Index executable, launched with no arguments
    pub index_executable: PathBuf,
    /// Model used to embed pushes and queries
    pub model: ModelSettings,
    /// Segments buffered before a batched push
    pub flush_threshold: usize,
    /// Grace period between half-closing stdin and killing the process
    pub shutdown_grace: Duration,
    /// Document size limit in characters
    pub max_document_chars: usize,
}

impl SessionConfig {
    /// Token window used when chunking documents.
    pub fn max_chunk_tokens(&self) -> usize {
        self.model.max_sequence_length
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (`<config dir>/rag-bridge/config.toml`)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (`RAG_*`, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, RagError> {
        let config_dir = ProjectDirs::from("", "", APP_NAME)
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("index_executable", default_index_executable())
            .map_err(|e| RagError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| RagError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // RAG_INDEX_EXECUTABLE, RAG_MODEL__REPO_ID, RAG_SESSION__FLUSH_THRESHOLD, ...
        builder = builder.add_source(
            Environment::with_prefix("RAG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| RagError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.index_executable.trim().is_empty() {
            return Err(RagError::Config("index_executable must be set".to_string()));
        }
        if self.model.max_sequence_length == 0 {
            return Err(RagError::Config(
                "model.max_sequence_length must be > 0".to_string(),
            ));
        }
        if self.model.dimension == 0 {
            return Err(RagError::Config("model.dimension must be > 0".to_string()));
        }
        if self.session.flush_threshold == 0 {
            return Err(RagError::Config(
                "session.flush_threshold must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand `~/` in the index executable path.
    pub fn expanded_index_executable(&self) -> PathBuf {
        expand_home(&self.index_executable)
    }

    /// Expand `~/` in the model cache path.
    pub fn expanded_model_cache_dir(&self) -> PathBuf {
        expand_home(&self.model.cache_dir)
    }

    /// Build the configuration for one named session.
    pub fn session_config(&self, name: &str) -> SessionConfig {
        let mut model = self.model.clone();
        model.cache_dir = self.expanded_model_cache_dir().to_string_lossy().to_string();

        SessionConfig {
            name: name.to_string(),
            index_executable: self.expanded_index_executable(),
            model,
            flush_threshold: self.session.flush_threshold,
            shutdown_grace: Duration::from_millis(self.session.shutdown_grace_ms),
            max_document_chars: self.session.max_document_chars,
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
