//! Command channel to an external vector-index process.
//!
//! The index runs as a child process. Commands are JSON payloads sent over
//! its stdin as length-prefixed frames; answers come back as marker lines
//! on its stdout.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use rag_channel::{IndexChannel, IndexCommand, ProcessChannel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut channel = ProcessChannel::spawn("vector-index")?;
//!
//!     channel
//!         .send(&IndexCommand::Query {
//!             text: "what was decided".to_string(),
//!             embedding: vec![0.0; 384],
//!         })
//!         .await?;
//!     println!("{:?}", channel.next_response().await?);
//!
//!     channel.close(Duration::from_secs(3)).await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod frame;
pub mod process;
pub mod protocol;

pub use channel::{IndexChannel, ShutdownOutcome};
pub use error::ChannelError;
pub use frame::{encode_frame, read_frame, FrameWriter, HEADER_LEN};
pub use process::ProcessChannel;
pub use protocol::{IndexCommand, IndexResponse, MATCH_MARKER, NOT_FOUND_MARKER};
