//! The two sessions the host application runs side by side.
//!
//! `live` indexes the ongoing transcript in buffered batches; `documents`
//! indexes uploaded files chunk by chunk. Each has its own index process,
//! so clearing or stopping one never affects the other.

use tracing::info;

use rag_channel::{IndexChannel, ShutdownOutcome};
use rag_embeddings::Embedder;
use rag_types::Settings;

use crate::error::SessionError;
use crate::session::{ProcessSession, RagSession};
use crate::transcript::parse_transcription_line;

pub const LIVE_SESSION: &str = "live";
pub const DOCUMENTS_SESSION: &str = "documents";

pub struct RagBridge<C, E> {
    live: RagSession<C, E>,
    documents: RagSession<C, E>,
}

pub type ProcessBridge = RagBridge<
    rag_channel::ProcessChannel,
    rag_embeddings::EmbeddingEngine<rag_embeddings::CandleBert>,
>;

impl ProcessBridge {
    /// Both sessions configured from `settings`, neither started.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            ProcessSession::new(settings.session_config(LIVE_SESSION)),
            ProcessSession::new(settings.session_config(DOCUMENTS_SESSION)),
        )
    }

    pub async fn start_live(&mut self) -> Result<(), SessionError> {
        self.live.start().await
    }

    pub async fn start_documents(&mut self) -> Result<(), SessionError> {
        self.documents.start().await
    }
}

impl<C: IndexChannel, E: Embedder> RagBridge<C, E> {
    pub fn new(live: RagSession<C, E>, documents: RagSession<C, E>) -> Self {
        Self { live, documents }
    }

    pub fn live(&mut self) -> &mut RagSession<C, E> {
        &mut self.live
    }

    pub fn documents(&mut self) -> &mut RagSession<C, E> {
        &mut self.documents
    }

    /// Feed one line of recorder output into the live session.
    ///
    /// Returns whether the line carried a transcription.
    pub async fn push_transcript_line(&mut self, line: &str) -> Result<bool, SessionError> {
        match parse_transcription_line(line) {
            Some(text) => {
                self.live.push_segment(text).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Nearest transcript passage, or an empty string.
    pub async fn live_query(&mut self, text: &str) -> Result<String, SessionError> {
        let answer = self.live.query(&[text.to_string()]).await?;
        Ok(answer.unwrap_or_default())
    }

    pub async fn push_document(&mut self, text: &str) -> Result<usize, SessionError> {
        self.documents.push_document(text).await
    }

    /// Nearest document chunk, or an empty string.
    pub async fn document_query(&mut self, text: &str) -> Result<String, SessionError> {
        let answer = self.documents.query(&[text.to_string()]).await?;
        Ok(answer.unwrap_or_default())
    }

    pub async fn clear_documents(&mut self) -> Result<(), SessionError> {
        self.documents.clear().await
    }

    pub async fn stop_live(&mut self) -> Result<Option<ShutdownOutcome>, SessionError> {
        self.live.stop().await
    }

    pub async fn stop_documents(&mut self) -> Result<Option<ShutdownOutcome>, SessionError> {
        self.documents.stop().await
    }

    /// Stop both sessions. Both are attempted even if the first fails.
    pub async fn stop_all(&mut self) -> Result<(), SessionError> {
        let live = self.live.stop().await;
        let documents = self.documents.stop().await;
        info!("Retrieval sessions stopped");
        live?;
        documents?;
        Ok(())
    }
}
