//! # rag-session
//!
//! Session lifecycle for the retrieval-augmentation bridge.
//!
//! A [`RagSession`] owns one index process, one embedding model and one
//! buffer of short segments. [`RagBridge`] runs the two sessions the host
//! application needs: one for the live transcript and one for uploaded
//! documents.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rag_session::ProcessBridge;
//! use rag_types::Settings;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load(None)?;
//! let mut bridge = ProcessBridge::from_settings(&settings);
//!
//! bridge.start_documents().await?;
//! bridge.push_document("Budget review moved to next week.").await?;
//! println!("{}", bridge.document_query("when is the budget review").await?);
//! bridge.stop_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod error;
pub mod session;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::{ProcessBridge, RagBridge, DOCUMENTS_SESSION, LIVE_SESSION};
pub use error::SessionError;
pub use session::{ProcessSession, RagSession, SessionState};
pub use transcript::{parse_transcription_line, TRANSCRIPTION_MARKER};
