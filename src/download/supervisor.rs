//! Lifecycle of the single ffmpeg child process.
//!
//! `RecordingProcess::start` spawns the recorder with piped stdin/stderr. A
//! background task turns stderr into `ProgressSnapshot` updates until EOF.
//! Stopping is cooperative: ffmpeg finishes the output file cleanly when it
//! reads `q` on stdin, so `StopHandle::request_stop` writes that token once and
//! closes the pipe.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::core::error::{AppError, AppResult};
use crate::download::progress::{ProgressParser, ProgressSnapshot};

/// Interactive key that makes ffmpeg finalize the output and exit.
pub const STOP_TOKEN: &[u8] = b"q";

/// Exit detail of a finished recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitReport {
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    /// Terminating signal (unix only)
    pub signal: Option<i32>,
    /// Last progress seen before exit
    pub progress: ProgressSnapshot,
}

impl ExitReport {
    fn from_status(status: io::Result<std::process::ExitStatus>, progress: ProgressSnapshot) -> Self {
        match status {
            Ok(status) => Self {
                succeeded: status.success(),
                exit_code: status.code(),
                signal: exit_signal(&status),
                progress,
            },
            Err(e) => {
                log::error!("Failed to collect ffmpeg exit status: {}", e);
                Self {
                    succeeded: false,
                    exit_code: None,
                    signal: None,
                    progress,
                }
            }
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// Result of a stop request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// The stop token was written and stdin closed
    Sent,
    /// stdin was already closed (stop sent earlier, or the process is gone)
    AlreadyClosed,
    /// Writing the token failed for another reason
    Failed(String),
}

/// Cloneable handle that can ask the running process to stop.
#[derive(Clone)]
pub struct StopHandle {
    stdin: Arc<Mutex<Option<ChildStdin>>>,
}

impl StopHandle {
    fn new(stdin: Option<ChildStdin>) -> Self {
        Self {
            stdin: Arc::new(Mutex::new(stdin)),
        }
    }

    /// Sends the stop token. Only the first call on a live pipe writes anything.
    pub async fn request_stop(&self) -> StopOutcome {
        let Some(mut stdin) = self.stdin.lock().await.take() else {
            return StopOutcome::AlreadyClosed;
        };

        let result: io::Result<()> = async {
            stdin.write_all(STOP_TOKEN).await?;
            stdin.flush().await?;
            stdin.shutdown().await
        }
        .await;
        drop(stdin);

        match result {
            Ok(()) => StopOutcome::Sent,
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                log::debug!("ffmpeg stdin already closed while sending stop token");
                StopOutcome::AlreadyClosed
            }
            Err(e) => {
                log::error!("Failed to send stop token to ffmpeg: {}", e);
                StopOutcome::Failed(e.to_string())
            }
        }
    }

    async fn close(&self) {
        self.stdin.lock().await.take();
    }
}

/// A spawned ffmpeg recording.
pub struct RecordingProcess {
    child: Child,
    stop: StopHandle,
    progress_rx: watch::Receiver<ProgressSnapshot>,
    stderr_task: Option<JoinHandle<ProgressSnapshot>>,
}

impl RecordingProcess {
    /// Spawns `bin` with `args`.
    pub fn start(bin: &Path, args: &[String]) -> AppResult<Self> {
        log::debug!("Spawning {} {}", bin.display(), args.join(" "));

        let mut child = Command::new(bin)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::Process(format!("failed to spawn {}: {}", bin.display(), e)))?;

        let (progress_tx, progress_rx) = watch::channel(ProgressSnapshot::default());
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(consume_stderr(stderr, progress_tx)));
        let stop = StopHandle::new(child.stdin.take());

        Ok(Self {
            child,
            stop,
            progress_rx,
            stderr_task,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Receiver that observes every parsed progress update.
    pub fn progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress_rx.clone()
    }

    /// Waits for the process to exit and collects its final report.
    ///
    /// The stderr consumer is joined here, so the final snapshot is taken once,
    /// after the last line has been parsed.
    pub async fn wait(mut self) -> ExitReport {
        let status = self.child.wait().await;
        self.stop.close().await;

        let progress = match self.stderr_task.take() {
            Some(task) => match task.await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    log::warn!("ffmpeg stderr consumer failed: {}", e);
                    self.progress_rx.borrow().clone()
                }
            },
            None => self.progress_rx.borrow().clone(),
        };

        ExitReport::from_status(status, progress)
    }
}

async fn consume_stderr(stderr: ChildStderr, tx: watch::Sender<ProgressSnapshot>) -> ProgressSnapshot {
    let mut reader = BufReader::new(stderr);
    let mut parser = ProgressParser::new();
    let mut line = Vec::with_capacity(256);

    loop {
        line.clear();
        match read_segment(&mut reader, &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if parser.feed(&line) {
                    tx.send_replace(parser.snapshot().clone());
                }
            }
            Err(e) => {
                log::warn!("Error reading ffmpeg stderr: {}", e);
                break;
            }
        }
    }

    log::debug!("ffmpeg stderr closed after {} progress updates", parser.ticks());
    parser.into_snapshot()
}

/// Longest stderr segment kept; the rest of an unterminated run is dropped.
const MAX_SEGMENT: usize = 4096;

/// Reads up to the next `\r` or `\n` into `out` (delimiter excluded).
///
/// At most `MAX_SEGMENT` bytes are kept in `out`, but the whole segment is consumed.
/// Returns the number of bytes consumed, 0 at EOF.
async fn read_segment<R: AsyncBufRead + Unpin>(reader: &mut R, out: &mut Vec<u8>) -> io::Result<usize> {
    let mut consumed = 0;
    loop {
        let (done, used) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(consumed);
            }
            let (done, end, used) = match available.iter().position(|b| *b == b'\r' || *b == b'\n') {
                Some(i) => (true, i, i + 1),
                None => (false, available.len(), available.len()),
            };
            let room = MAX_SEGMENT.saturating_sub(out.len());
            out.extend_from_slice(&available[..end.min(room)]);
            (done, used)
        };
        reader.consume(used);
        consumed += used;
        if done {
            return Ok(consumed);
        }
    }
}
