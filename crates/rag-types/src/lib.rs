//! # rag-types
//!
//! Shared types for the retrieval-augmentation bridge.
//!
//! - Settings: layered configuration for the index process, embedding model
//!   and session policy
//! - Document limits applied to extracted upload text
//! - The crate-wide error type
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rag_types::Settings;
//!
//! let settings = Settings::load(None).unwrap();
//! let live = settings.session_config("live");
//! assert_eq!(live.flush_threshold, 25);
//! ```

pub mod config;
pub mod document;
pub mod error;

pub use config::{ModelSettings, SessionConfig, SessionSettings, Settings};
pub use document::{normalize_document_text, DEFAULT_MAX_DOCUMENT_CHARS};
pub use error::RagError;
