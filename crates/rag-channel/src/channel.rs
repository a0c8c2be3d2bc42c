//! The seam between a session and whatever runs the index.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::protocol::{IndexCommand, IndexResponse};

/// How the index process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Exited on its own within the grace period
    Exited(Option<i32>),
    /// Still running after the grace period and was killed
    Killed,
}

/// A bidirectional command channel to a vector index.
///
/// Commands go out in the order they are sent. Responses are matched to
/// queries purely by order, so callers must not have more than one query
/// outstanding; `&mut self` enforces that for a single owner.
#[async_trait]
pub trait IndexChannel: Send {
    /// Send one command as one frame.
    async fn send(&mut self, command: &IndexCommand) -> Result<(), ChannelError>;

    /// Wait for the next response line, skipping anything that is not a
    /// response marker. Fails with [`ChannelError::Closed`] if the output
    /// stream ends first.
    async fn next_response(&mut self) -> Result<IndexResponse, ChannelError>;

    /// Ask the index to stop, close its input, and wait up to `grace`
    /// before killing it. Calling this again returns the first outcome.
    async fn close(&mut self, grace: Duration) -> Result<ShutdownOutcome, ChannelError>;
}
