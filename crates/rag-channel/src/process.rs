//! [`IndexChannel`] over a child process's stdio.
//!
//! stdin carries frames; stdout and stderr are drained by background tasks
//! so the child never blocks on a full pipe. stdout lines are queued for
//! [`IndexChannel::next_response`], stderr lines are logged.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::channel::{IndexChannel, ShutdownOutcome};
use crate::error::ChannelError;
use crate::frame::FrameWriter;
use crate::protocol::{IndexCommand, IndexResponse};

/// A spawned index process.
pub struct ProcessChannel {
    program: PathBuf,
    child: Child,
    writer: Option<FrameWriter<ChildStdin>>,
    lines: mpsc::UnboundedReceiver<String>,
    readers: Vec<JoinHandle<()>>,
    outcome: Option<ShutdownOutcome>,
}

impl ProcessChannel {
    /// Launch `program` with piped stdio.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(program: impl AsRef<Path>) -> Result<Self, ChannelError> {
        Self::from_command(Command::new(program.as_ref()))
    }

    /// Launch a prepared command. Its stdio is replaced with pipes.
    pub fn from_command(mut command: Command) -> Result<Self, ChannelError> {
        let program = PathBuf::from(command.as_std().get_program());

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ChannelError::Spawn {
                program: program.display().to_string(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(ChannelError::Closed)?;
        let stdout = child.stdout.take().ok_or(ChannelError::Closed)?;
        let stderr = child.stderr.take().ok_or(ChannelError::Closed)?;

        let (tx, lines) = mpsc::unbounded_channel();
        let readers = vec![
            tokio::spawn(forward_stdout(stdout, tx)),
            tokio::spawn(log_stderr(stderr, program.display().to_string())),
        ];

        info!(program = %program.display(), pid = ?child.id(), "Index process started");

        Ok(Self {
            program,
            child,
            writer: Some(FrameWriter::new(stdin)),
            lines,
            readers,
            outcome: None,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// OS process id, `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Whether the process has already exited.
    pub fn has_exited(&mut self) -> bool {
        self.outcome.is_some() || matches!(self.child.try_wait(), Ok(Some(_)))
    }

    /// Write a raw payload as one frame.
    ///
    /// Checks the process is still alive first, so writing to a dead index
    /// reports [`ChannelError::ProcessExited`] rather than a broken pipe.
    pub async fn send_frame(&mut self, payload: &[u8]) -> Result<(), ChannelError> {
        if self.outcome.is_some() {
            return Err(ChannelError::Closed);
        }
        if let Some(status) = self.child.try_wait()? {
            return Err(ChannelError::ProcessExited(status.code()));
        }

        let writer = self.writer.as_mut().ok_or(ChannelError::Closed)?;
        writer.send(payload).await
    }

    /// Next raw stdout line, `None` once stdout is closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    async fn shutdown(&mut self, grace: Duration) -> Result<ShutdownOutcome, ChannelError> {
        if let Some(mut writer) = self.writer.take() {
            match IndexCommand::Stop.to_payload() {
                Ok(payload) => {
                    if let Err(e) = writer.send(&payload).await {
                        warn!(error = %e, "Failed to send stop command");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to encode stop command"),
            }
            if let Err(e) = writer.shutdown().await {
                debug!(error = %e, "Closing index stdin failed");
            }
        }

        let outcome = match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => ShutdownOutcome::Exited(status?.code()),
            Err(_) => {
                warn!(
                    program = %self.program.display(),
                    grace_ms = grace.as_millis() as u64,
                    "Index process did not exit in time, killing"
                );
                self.child.kill().await?;
                ShutdownOutcome::Killed
            }
        };

        for reader in self.readers.drain(..) {
            reader.abort();
        }

        info!(?outcome, "Index process stopped");
        Ok(outcome)
    }
}

#[async_trait]
impl IndexChannel for ProcessChannel {
    async fn send(&mut self, command: &IndexCommand) -> Result<(), ChannelError> {
        let payload = command.to_payload()?;
        debug!(command = command.name(), bytes = payload.len(), "Sending");
        self.send_frame(&payload).await
    }

    async fn next_response(&mut self) -> Result<IndexResponse, ChannelError> {
        while let Some(line) = self.lines.recv().await {
            match IndexResponse::parse(&line) {
                Some(response) => return Ok(response),
                None => debug!(%line, "Index output"),
            }
        }
        Err(ChannelError::Closed)
    }

    async fn close(&mut self, grace: Duration) -> Result<ShutdownOutcome, ChannelError> {
        if let Some(outcome) = self.outcome {
            return Ok(outcome);
        }
        let outcome = self.shutdown(grace).await?;
        self.outcome = Some(outcome);
        Ok(outcome)
    }
}

/// Next newline-terminated line, decoded lossily. `None` at end of stream.
///
/// Index processes may log in any encoding; a stray byte must not end the
/// stream.
async fn read_lossy_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.ends_with(b"\n") {
        buf.pop();
        if buf.ends_with(b"\r") {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

async fn forward_stdout<R>(stdout: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        match read_lossy_line(&mut reader, &mut buf).await {
            Ok(Some(line)) => {
                trace!(%line, "stdout");
                if tx.send(line).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Reading index stdout failed");
                break;
            }
        }
    }
}

async fn log_stderr<R>(stderr: R, program: String)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    loop {
        match read_lossy_line(&mut reader, &mut buf).await {
            Ok(Some(line)) => warn!(target: "rag_channel::index", %program, "{}", line),
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "Reading index stderr failed");
                break;
            }
        }
    }
}
