//! Error types for the index channel.

use thiserror::Error;

/// Errors that can occur while talking to the index process.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The executable could not be launched (missing, not executable, ...)
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the process's stdin failed (broken pipe, ...)
    #[error("Channel write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The process exited before the write was attempted
    #[error("Index process has exited (code {0:?})")]
    ProcessExited(Option<i32>),

    /// The channel was closed or the output stream ended while a response
    /// was still expected
    #[error("Index channel closed")]
    Closed,

    /// Payload does not fit the 4-byte length header
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Serialization failed
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other process I/O (waiting, killing)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Whether the session owning this channel must be torn down.
    ///
    /// After a failed write the index may hold partial state, so the
    /// channel is never reused.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChannelError::Write(_)
                | ChannelError::ProcessExited(_)
                | ChannelError::Closed
                | ChannelError::Io(_)
        )
    }
}
