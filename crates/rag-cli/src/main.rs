//! Retrieval-augmentation bridge
//!
//! Embeds text with a local model and drives an external vector-index
//! process over framed stdin/stdout.
//!
//! # Usage
//!
//! ```bash
//! rag-bridge ingest notes.txt --query "when is the review"
//! rag-bridge listen [--raw]
//! rag-bridge chunk notes.txt [--max-tokens 256]
//! rag-bridge fetch-model
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (<config dir>/rag-bridge/config.toml)
//! 3. Environment variables (RAG_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use rag_cli::{
    fetch_model, init_logging, load_settings, run_chunk, run_ingest, run_listen, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(
        cli.config.as_deref(),
        cli.log_level.as_deref(),
        cli.index.as_deref(),
    )?;
    init_logging(&settings)?;

    match cli.command {
        Commands::Ingest { file, queries } => {
            run_ingest(&settings, &file, &queries).await?;
        }
        Commands::Listen { raw } => {
            run_listen(&settings, raw).await?;
        }
        Commands::Chunk { file, max_tokens } => {
            run_chunk(&settings, &file, max_tokens)?;
        }
        Commands::FetchModel => {
            fetch_model(&settings)?;
        }
    }

    Ok(())
}
