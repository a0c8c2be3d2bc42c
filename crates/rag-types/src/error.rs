//! Error types shared by the bridge crates.

use thiserror::Error;

/// Unified error type for configuration and input validation.
#[derive(Debug, Error)]
pub enum RagError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
