//! CLI argument parsing for the retrieval bridge.
//!
//! Flags override every other config source.

use clap::{Parser, Subcommand};

/// Retrieval-augmentation bridge
///
/// Embeds text locally and drives an external vector-index process.
#[derive(Parser, Debug)]
#[command(name = "rag-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides the default config location)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the vector-index executable
    #[arg(long, global = true)]
    pub index: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a text file through the documents session and query it
    Ingest {
        /// UTF-8 text file to index
        file: String,

        /// Query to run after indexing (repeatable)
        #[arg(short, long = "query")]
        queries: Vec<String>,
    },

    /// Feed stdin lines into the live session
    ///
    /// Lines starting with [TRANSCRIPTION] become segments. Control lines:
    /// `/query <text>`, `/flush`, `/clear`.
    Listen {
        /// Treat every non-control line as a segment
        #[arg(long)]
        raw: bool,
    },

    /// Show how a file would be chunked, without starting an index
    Chunk {
        /// UTF-8 text file to chunk
        file: String,

        /// Token window per chunk (default: model max sequence length)
        #[arg(short, long)]
        max_tokens: Option<usize>,
    },

    /// Download the embedding model into the cache
    FetchModel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_ingest_with_queries() {
        let cli = Cli::parse_from([
            "rag-bridge",
            "ingest",
            "notes.txt",
            "--query",
            "budget",
            "-q",
            "deadline",
        ]);
        match cli.command {
            Commands::Ingest { file, queries } => {
                assert_eq!(file, "notes.txt");
                assert_eq!(queries, vec!["budget", "deadline"]);
            }
            _ => panic!("Expected Ingest command"),
        }
    }

    #[test]
    fn test_cli_listen_raw() {
        let cli = Cli::parse_from(["rag-bridge", "listen", "--raw"]);
        assert!(matches!(cli.command, Commands::Listen { raw: true }));
    }

    #[test]
    fn test_cli_chunk_max_tokens() {
        let cli = Cli::parse_from(["rag-bridge", "chunk", "doc.txt", "--max-tokens", "128"]);
        match cli.command {
            Commands::Chunk { max_tokens, .. } => assert_eq!(max_tokens, Some(128)),
            _ => panic!("Expected Chunk command"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "rag-bridge",
            "fetch-model",
            "--index",
            "/opt/index/vector-index",
            "--log-level",
            "debug",
        ]);
        assert!(matches!(cli.command, Commands::FetchModel));
        assert_eq!(cli.index.as_deref(), Some("/opt/index/vector-index"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::parse_from(["rag-bridge", "--config", "/path/to/config.toml", "listen"]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
    }
}
