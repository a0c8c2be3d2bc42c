//! Command payloads and response markers.
//!
//! Commands travel as JSON inside length-prefixed frames:
//!
//! ```text
//! {"command":"push","text":"...","embedding":[0.1, ...]}
//! {"command":"query","text":"...","embedding":[0.1, ...]}
//! {"command":"clear"}
//! {"command":"stop"}
//! ```
//!
//! Responses come back as plain stdout lines. Only two markers mean
//! anything; every other line is log output from the index process.

use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Prefix of a successful query answer. The rest of the line is the match.
pub const MATCH_MARKER: &str = "[MATCH] ";

/// Line emitted when a query has no match.
pub const NOT_FOUND_MARKER: &str = "[MATCH_NOT_FOUND]";

/// A command understood by the index process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum IndexCommand {
    /// Store `text` under `embedding`
    Push { text: String, embedding: Vec<f32> },
    /// Find the stored text nearest to `embedding`
    Query { text: String, embedding: Vec<f32> },
    /// Drop everything stored so far
    Clear,
    /// Flush and exit
    Stop,
}

impl IndexCommand {
    /// Serialize to the UTF-8 JSON payload carried by one frame.
    pub fn to_payload(&self) -> Result<Vec<u8>, ChannelError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            IndexCommand::Push { .. } => "push",
            IndexCommand::Query { .. } => "query",
            IndexCommand::Clear => "clear",
            IndexCommand::Stop => "stop",
        }
    }
}

/// Answer to a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexResponse {
    Match(String),
    NotFound,
}

impl IndexResponse {
    /// Recognize a response line. Returns `None` for log output.
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(rest) = line.strip_prefix(MATCH_MARKER) {
            return Some(IndexResponse::Match(rest.trim().to_string()));
        }
        if line.starts_with(NOT_FOUND_MARKER) {
            return Some(IndexResponse::NotFound);
        }
        None
    }

    pub fn into_match(self) -> Option<String> {
        match self {
            IndexResponse::Match(text) => Some(text),
            IndexResponse::NotFound => None,
        }
    }
}
