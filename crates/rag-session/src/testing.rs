//! In-memory doubles for session tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use rag_channel::{ChannelError, IndexChannel, IndexCommand, IndexResponse, ShutdownOutcome};
use rag_embeddings::{Embedder, Embedding, EmbeddingError, ModelInfo, TextChunk};
use rag_types::{ModelSettings, SessionConfig, DEFAULT_MAX_DOCUMENT_CHARS};

pub(crate) fn session_config(name: &str) -> SessionConfig {
    SessionConfig {
        name: name.to_string(),
        index_executable: PathBuf::from("vector-index"),
        model: ModelSettings::default(),
        flush_threshold: 25,
        shutdown_grace: Duration::from_millis(3000),
        max_document_chars: DEFAULT_MAX_DOCUMENT_CHARS,
    }
}

#[derive(Default)]
struct ChannelLog {
    sent: Vec<IndexCommand>,
    responses: VecDeque<IndexResponse>,
    closes: usize,
    broken: bool,
}

/// Records every command; answers queries from a script.
///
/// Clones share state, so a test keeps one clone to inspect what the
/// session sent.
#[derive(Clone, Default)]
pub(crate) struct RecordingChannel {
    log: Arc<Mutex<ChannelLog>>,
}

impl RecordingChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, response: IndexResponse) {
        self.log.lock().unwrap().responses.push_back(response);
    }

    /// Make every later write fail like a dead pipe.
    pub(crate) fn break_pipe(&self) {
        self.log.lock().unwrap().broken = true;
    }

    pub(crate) fn sent(&self) -> Vec<IndexCommand> {
        self.log.lock().unwrap().sent.clone()
    }

    pub(crate) fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }
}

#[async_trait]
impl IndexChannel for RecordingChannel {
    async fn send(&mut self, command: &IndexCommand) -> Result<(), ChannelError> {
        let mut log = self.log.lock().unwrap();
        if log.broken {
            return Err(ChannelError::Write(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )));
        }
        log.sent.push(command.clone());
        Ok(())
    }

    async fn next_response(&mut self) -> Result<IndexResponse, ChannelError> {
        self.log
            .lock()
            .unwrap()
            .responses
            .pop_front()
            .ok_or(ChannelError::Closed)
    }

    async fn close(&mut self, _grace: Duration) -> Result<ShutdownOutcome, ChannelError> {
        self.log.lock().unwrap().closes += 1;
        Ok(ShutdownOutcome::Exited(Some(0)))
    }
}

/// Deterministic embedder: chunks on whitespace, embeds to a constant
/// vector, and records the joined text of every embed call.
#[derive(Clone)]
pub(crate) struct FakeEmbedder {
    info: ModelInfo,
    chunk_words: Option<usize>,
    fail_on: Option<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "fake".to_string(),
                dimension,
                max_sequence_length: 512,
            },
            chunk_words: None,
            fail_on: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Cap chunks at `words` words regardless of the requested window.
    pub(crate) fn with_chunk_words(mut self, words: usize) -> Self {
        self.chunk_words = Some(words);
        self
    }

    /// Fail any embed whose text contains `needle`.
    pub(crate) fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Embedder for FakeEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed_segments(&self, segments: &[String]) -> Result<Embedding, EmbeddingError> {
        let text = segments.join(" ").trim().to_string();
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput("blank".to_string()));
        }
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(EmbeddingError::InvalidInput(format!("refusing {needle}")));
            }
        }
        self.calls.lock().unwrap().push(text);
        Ok(Embedding::new(vec![0.5; self.info.dimension]))
    }

    fn chunk(&self, text: &str, max_tokens: usize) -> Result<Vec<TextChunk>, EmbeddingError> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Err(EmbeddingError::EmptyInput("blank".to_string()));
        }
        let window = self.chunk_words.unwrap_or(max_tokens).min(max_tokens);
        Ok(words
            .chunks(window)
            .enumerate()
            .map(|(index, window)| TextChunk {
                index,
                text: window.join(" "),
                token_ids: (0..window.len() as u32).collect(),
            })
            .collect())
    }
}
