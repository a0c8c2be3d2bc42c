//! Retrieval bridge CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (ingest, listen, chunk, fetch-model)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    fetch_model, init_logging, load_settings, parse_listen_line, run_chunk, run_ingest,
    run_listen, ListenInput,
};
