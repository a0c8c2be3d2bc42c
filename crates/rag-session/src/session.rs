//! One index process + one embedding model + one segment buffer.
//!
//! ```text
//! Unstarted --start ok--> Started --stop / fatal channel error--> Stopped
//!     |
//!     +-----start failed--> Failed
//! ```
//!
//! Every operation outside `Started` is a silent no-op, so the host keeps
//! working without retrieval when the index or the model is unavailable.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use rag_channel::{ChannelError, IndexChannel, IndexCommand, ProcessChannel, ShutdownOutcome};
use rag_embeddings::{CandleBert, Embedder, EmbeddingEngine, EmbeddingError};
use rag_types::{normalize_document_text, ModelSettings, SessionConfig};

use crate::error::SessionError;

/// Observable lifecycle state of a [`RagSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unstarted,
    Started,
    /// Start was attempted and failed; the session stays inert
    Failed,
    Stopped,
}

struct Live<C, E> {
    channel: C,
    embedder: E,
    buffer: Vec<String>,
}

enum Phase<C, E> {
    Unstarted,
    Started(Live<C, E>),
    Failed,
    Stopped,
}

/// A session bound to one index process.
///
/// Sessions share nothing; two of them never see each other's channel,
/// buffer or process.
pub struct RagSession<C, E> {
    config: SessionConfig,
    phase: Phase<C, E>,
}

/// The production session: a spawned index process and a Candle model.
pub type ProcessSession = RagSession<ProcessChannel, EmbeddingEngine<CandleBert>>;

impl ProcessSession {
    /// Spawn the configured index executable and load the model.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        self.start_with(
            |program| ProcessChannel::spawn(program),
            |settings| EmbeddingEngine::load(settings),
        )
        .await
    }
}

impl<C: IndexChannel, E: Embedder> RagSession<C, E> {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: Phase::Unstarted,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Unstarted => SessionState::Unstarted,
            Phase::Started(_) => SessionState::Started,
            Phase::Failed => SessionState::Failed,
            Phase::Stopped => SessionState::Stopped,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self.phase, Phase::Started(_))
    }

    /// Segments waiting for the next batched push.
    pub fn buffered(&self) -> usize {
        match &self.phase {
            Phase::Started(live) => live.buffer.len(),
            _ => 0,
        }
    }

    /// Open the channel, then load the model.
    ///
    /// On failure the session moves to [`SessionState::Failed`] and any
    /// channel already opened is shut down. Does nothing unless the session
    /// is unstarted.
    pub async fn start_with<O, L>(&mut self, open: O, load: L) -> Result<(), SessionError>
    where
        O: FnOnce(&Path) -> Result<C, ChannelError>,
        L: FnOnce(&ModelSettings) -> Result<E, EmbeddingError>,
    {
        if !matches!(self.phase, Phase::Unstarted) {
            debug!(session = %self.config.name, state = ?self.state(), "Start ignored");
            return Ok(());
        }

        let mut channel = match open(&self.config.index_executable) {
            Ok(channel) => channel,
            Err(e) => {
                warn!(session = %self.config.name, error = %e, "Index process unavailable");
                self.phase = Phase::Failed;
                return Err(e.into());
            }
        };

        let embedder = match load(&self.config.model) {
            Ok(embedder) => embedder,
            Err(e) => {
                warn!(session = %self.config.name, error = %e, "Embedding model unavailable");
                if let Err(close_err) = channel.close(self.config.shutdown_grace).await {
                    warn!(error = %close_err, "Failed to shut down index process");
                }
                self.phase = Phase::Failed;
                return Err(e.into());
            }
        };

        info!(
            session = %self.config.name,
            model = %embedder.info().name,
            dim = embedder.info().dimension,
            "Session started"
        );
        self.phase = Phase::Started(Live {
            channel,
            embedder,
            buffer: Vec::new(),
        });
        Ok(())
    }

    /// Buffer a short segment, pushing the whole buffer as one unit once it
    /// reaches the flush threshold. Blank segments are ignored.
    pub async fn push_segment(&mut self, text: &str) -> Result<(), SessionError> {
        let Phase::Started(live) = &mut self.phase else {
            trace!(session = %self.config.name, "push_segment ignored, session not started");
            return Ok(());
        };

        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        live.buffer.push(text.to_string());
        if live.buffer.len() >= self.config.flush_threshold {
            self.flush().await?;
        }
        Ok(())
    }

    /// Embed everything buffered as one joined unit and push it.
    ///
    /// The buffer is drained first: if embedding or sending fails, those
    /// segments are dropped rather than retried.
    pub async fn flush(&mut self) -> Result<(), SessionError> {
        let Phase::Started(live) = &mut self.phase else {
            trace!(session = %self.config.name, "flush ignored, session not started");
            return Ok(());
        };
        if live.buffer.is_empty() {
            return Ok(());
        }

        let segments = std::mem::take(&mut live.buffer);
        let embedding = live.embedder.embed_segments(&segments)?;
        let command = IndexCommand::Push {
            text: segments.join(" ").trim().to_string(),
            embedding: embedding.into_values(),
        };

        if let Err(e) = live.channel.send(&command).await {
            return Err(self.fail(e).await);
        }
        debug!(
            session = %self.config.name,
            segments = segments.len(),
            "Pushed buffered segments"
        );
        Ok(())
    }

    /// Chunk a document and push every chunk individually, in order.
    ///
    /// Returns the number of chunks pushed. The first failure aborts the
    /// rest; chunks already pushed stay in the index.
    pub async fn push_document(&mut self, text: &str) -> Result<usize, SessionError> {
        let Phase::Started(live) = &mut self.phase else {
            trace!(session = %self.config.name, "push_document ignored, session not started");
            return Ok(0);
        };

        let text = normalize_document_text(text, self.config.max_document_chars)?;
        let embedded = live
            .embedder
            .embed_document(text, self.config.max_chunk_tokens())?;
        let total = embedded.len();

        let mut failure = None;
        for item in embedded {
            let (chunk, embedding) = item?;
            let (index, tokens) = (chunk.index, chunk.token_count());
            let command = IndexCommand::Push {
                text: chunk.text,
                embedding: embedding.into_values(),
            };
            if let Err(e) = live.channel.send(&command).await {
                failure = Some(e);
                break;
            }
            trace!(chunk = index, tokens, "Pushed chunk");
        }
        if let Some(e) = failure {
            return Err(self.fail(e).await);
        }

        info!(session = %self.config.name, chunks = total, "Pushed document");
        Ok(total)
    }

    /// Embed `segments` as one unit and ask the index for its nearest match.
    ///
    /// Waits for exactly one response; `None` means the index found nothing
    /// or the session is not started.
    pub async fn query(&mut self, segments: &[String]) -> Result<Option<String>, SessionError> {
        let Phase::Started(live) = &mut self.phase else {
            trace!(session = %self.config.name, "query ignored, session not started");
            return Ok(None);
        };

        let embedding = live.embedder.embed_segments(segments)?;
        let command = IndexCommand::Query {
            text: segments.join(" ").trim().to_string(),
            embedding: embedding.into_values(),
        };

        if let Err(e) = live.channel.send(&command).await {
            return Err(self.fail(e).await);
        }
        let response = live.channel.next_response().await;
        match response {
            Ok(response) => {
                debug!(session = %self.config.name, ?response, "Query answered");
                Ok(response.into_match())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Ask the index to drop everything it holds. No response is awaited.
    pub async fn clear(&mut self) -> Result<(), SessionError> {
        let Phase::Started(live) = &mut self.phase else {
            trace!(session = %self.config.name, "clear ignored, session not started");
            return Ok(());
        };

        if let Err(e) = live.channel.send(&IndexCommand::Clear).await {
            return Err(self.fail(e).await);
        }
        info!(session = %self.config.name, "Index cleared");
        Ok(())
    }

    /// Shut the index process down and release the model.
    ///
    /// Buffered segments are discarded, not flushed. Returns `None` when the
    /// session was not started.
    pub async fn stop(&mut self) -> Result<Option<ShutdownOutcome>, SessionError> {
        if !self.is_started() {
            return Ok(None);
        }
        let Phase::Started(mut live) = std::mem::replace(&mut self.phase, Phase::Stopped) else {
            return Ok(None);
        };

        if !live.buffer.is_empty() {
            warn!(
                session = %self.config.name,
                discarded = live.buffer.len(),
                "Stopping with unflushed segments"
            );
        }

        let outcome = live.channel.close(self.config.shutdown_grace).await?;
        info!(session = %self.config.name, ?outcome, "Session stopped");
        Ok(Some(outcome))
    }

    /// Tear the session down if `error` leaves the channel unusable.
    async fn fail(&mut self, error: ChannelError) -> SessionError {
        if error.is_fatal() && self.is_started() {
            if let Phase::Started(mut live) = std::mem::replace(&mut self.phase, Phase::Stopped) {
                error!(
                    session = %self.config.name,
                    error = %error,
                    "Index channel failed, stopping session"
                );
                if let Err(e) = live.channel.close(Duration::ZERO).await {
                    warn!(error = %e, "Failed to shut down index process");
                }
            }
        }
        error.into()
    }
}
