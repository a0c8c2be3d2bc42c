//! Command implementations for the retrieval bridge CLI.
//!
//! Handles:
//! - ingest: push a file through the documents session, answer queries
//! - listen: stream stdin into the live session
//! - chunk: print the chunk plan for a file
//! - fetch-model: warm the model cache

use std::fs;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

use rag_embeddings::{chunk_text, get_or_download_model, ModelCache, SegmentTokenizer};
use rag_session::{parse_transcription_line, ProcessBridge, SessionError};
use rag_types::Settings;

/// Load configuration and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    index_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    if let Some(index) = index_override {
        settings.index_executable = index.to_string();
    }

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Logs go to stderr; stdout carries command output.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Index one file in a fresh documents session, then run each query.
pub async fn run_ingest(settings: &Settings, file: &str, queries: &[String]) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?;

    let mut bridge = ProcessBridge::from_settings(settings);
    bridge
        .start_documents()
        .await
        .context("Failed to start documents session")?;

    let result = ingest_and_query(&mut bridge, &text, queries).await;
    bridge.stop_all().await.context("Failed to stop sessions")?;
    result
}

async fn ingest_and_query(
    bridge: &mut ProcessBridge,
    text: &str,
    queries: &[String],
) -> Result<()> {
    let chunks = bridge
        .push_document(text)
        .await
        .context("Failed to index document")?;
    println!("Indexed {} chunk(s)", chunks);

    for query in queries {
        let answer = bridge
            .document_query(query)
            .await
            .with_context(|| format!("Query failed: {}", query))?;
        if answer.is_empty() {
            println!("{} => (no match)", query);
        } else {
            println!("{} => {}", query, answer);
        }
    }
    Ok(())
}

/// One line of `listen` input.
#[derive(Debug, PartialEq, Eq)]
pub enum ListenInput<'a> {
    Query(&'a str),
    Flush,
    Clear,
    Segment(&'a str),
}

/// Classify a stdin line. `None` means the line is ignored.
///
/// Without `raw`, only transcription lines become segments.
pub fn parse_listen_line(line: &str, raw: bool) -> Option<ListenInput<'_>> {
    let trimmed = line.trim();
    if let Some(query) = trimmed.strip_prefix("/query ") {
        let query = query.trim();
        return (!query.is_empty()).then_some(ListenInput::Query(query));
    }
    match trimmed {
        "/flush" => return Some(ListenInput::Flush),
        "/clear" => return Some(ListenInput::Clear),
        _ => {}
    }

    if raw {
        (!trimmed.is_empty()).then_some(ListenInput::Segment(trimmed))
    } else {
        parse_transcription_line(trimmed).map(ListenInput::Segment)
    }
}

/// Stream stdin into the live session until EOF or Ctrl+C.
pub async fn run_listen(settings: &Settings, raw: bool) -> Result<()> {
    let mut bridge = ProcessBridge::from_settings(settings);
    bridge
        .start_live()
        .await
        .context("Failed to start live session")?;
    info!(raw, "Listening on stdin");

    let result = listen_loop(&mut bridge, raw).await;
    bridge.stop_all().await.context("Failed to stop sessions")?;
    result
}

async fn listen_loop(bridge: &mut ProcessBridge, raw: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                return Ok(());
            }
        };
        let Some(line) = line else {
            info!("End of input");
            return Ok(());
        };

        let result = match parse_listen_line(&line, raw) {
            Some(ListenInput::Query(query)) => bridge
                .live_query(query)
                .await
                .map(|answer| println!("{}", answer)),
            Some(ListenInput::Flush) => bridge.live().flush().await,
            Some(ListenInput::Clear) => bridge.live().clear().await,
            Some(ListenInput::Segment(text)) => bridge.live().push_segment(text).await,
            None => continue,
        };
        settle_listen_result(result)?;

        if !bridge.live().is_started() {
            warn!("Live session is no longer running");
            return Ok(());
        }
    }
}

/// Fatal session errors end `listen`; anything else is logged and skipped.
fn settle_listen_result(result: Result<(), SessionError>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_fatal() => Err(e).context("Live session failed"),
        Err(e) => {
            warn!(error = %e, "Live input dropped");
            Ok(())
        }
    }
}

/// Print the chunk plan for a file: index, token count, preview.
pub fn run_chunk(settings: &Settings, file: &str, max_tokens: Option<usize>) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?;

    let cache = ModelCache::new(settings.expanded_model_cache_dir(), &settings.model.repo_id);
    let paths = get_or_download_model(&cache).context("Failed to fetch model files")?;
    let tokenizer =
        SegmentTokenizer::from_file(&paths.tokenizer, settings.model.max_sequence_length)
            .context("Failed to load tokenizer")?;

    let window = max_tokens
        .unwrap_or(settings.model.max_sequence_length)
        .min(tokenizer.content_capacity());
    let chunks = chunk_text(&tokenizer, &text, window).context("Failed to chunk document")?;

    println!("{} chunk(s), window {} tokens", chunks.len(), window);
    for chunk in &chunks {
        println!("{:>4}  {:>4}  {}", chunk.index, chunk.token_count(), preview(&chunk.text, 60));
    }
    Ok(())
}

/// Download the configured model if it is not cached yet.
pub fn fetch_model(settings: &Settings) -> Result<()> {
    let cache = ModelCache::new(settings.expanded_model_cache_dir(), &settings.model.repo_id);
    if cache.is_cached() {
        println!("Model already cached at {}", cache.model_dir().display());
        return Ok(());
    }

    let paths = get_or_download_model(&cache).context("Failed to download model")?;
    println!("Model cached:");
    println!("  config:    {}", paths.config.display());
    println!("  tokenizer: {}", paths.tokenizer.display());
    println!("  weights:   {}", paths.weights.display());
    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let cut: String = single_line.chars().take(max_chars).collect();
    format!("{}...", cut)
}
