//! Helpers for running child processes with live output, timeouts and cancellation.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::error::ExecError;
use crate::io::sink::LogSink;

pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// How often the wait loop checks a cancellation token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Quiet time after exit before output forwarding gives up on open pipes.
pub const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Cooperative cancellation flag shared between the caller and a running command.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bounds applied to one child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    /// Captured log bytes kept in memory. The sink still sees every line.
    pub output_limit_bytes: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            timeout: None,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TimedOut,
    Cancelled,
}

/// Captured child process output.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    /// Combined stdout/stderr lines in arrival order.
    pub log: String,
    pub truncated: usize,
    /// Set when the child was killed instead of exiting on its own.
    pub stopped: Option<StopReason>,
}

impl ProcessOutput {
    pub fn truncated_notice(&self) -> String {
        if self.truncated > 0 {
            format!("\n[output truncated {} bytes]\n", self.truncated)
        } else {
            String::new()
        }
    }

    /// The captured log with the truncation notice appended.
    pub fn into_log(self) -> String {
        let notice = self.truncated_notice();
        let mut log = self.log;
        log.push_str(&notice);
        log
    }
}

/// Run a command, forwarding each stdout/stderr line to `sink` as soon as it is read.
///
/// Each pipe is drained on its own reader thread so neither can fill up and
/// deadlock the child. Lines reach the sink through a channel in arrival order.
/// The calling thread blocks until the child exits, the timeout elapses or
/// `cancel` fires; in the last two cases the child is killed and
/// [`ProcessOutput::stopped`] says why.
///
/// A grandchild that inherited the pipes can keep them open after the child is
/// gone. Once the child has exited, forwarding stops after [`DRAIN_GRACE`]
/// without new output and the readers are left to finish on their own.
#[instrument(skip_all, fields(program = %program, timeout_secs = ?limits.timeout.map(|t| t.as_secs())))]
pub fn run_streaming(
    program: &str,
    mut cmd: Command,
    sink: &dyn LogSink,
    limits: RunLimits,
    cancel: Option<&CancelToken>,
) -> Result<ProcessOutput, ExecError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(ExecError::Launch {
                program: program.to_string(),
                source: e,
            });
        }
    };

    let io_err = |source: std::io::Error| ExecError::Io {
        program: program.to_string(),
        source,
    };
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io_err(std::io::Error::other("stdout was not piped")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io_err(std::io::Error::other("stderr was not piped")))?;

    let (tx, rx) = mpsc::channel();
    spawn_reader(stdout, tx.clone());
    spawn_reader(stderr, tx);

    let exited = AtomicBool::new(false);
    let (waited, forwarded) = thread::scope(|scope| {
        let exited = &exited;
        let forwarder =
            scope.spawn(move || forward(&rx, sink, limits.output_limit_bytes, exited));

        let waited = wait_for_exit(&mut child, limits.timeout, cancel);
        if waited.is_err() {
            let _ = child.kill();
        }
        exited.store(true, Ordering::SeqCst);
        let forwarded = forwarder
            .join()
            .map_err(|_| std::io::Error::other("output forwarder panicked"));
        (waited, forwarded)
    });

    let (status, stopped) = waited.map_err(io_err)?;
    let (capture, failure) = forwarded.map_err(io_err)?;
    if let Some(err) = failure {
        return Err(io_err(err));
    }
    if capture.truncated > 0 {
        warn!(truncated = capture.truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), ?stopped, "command finished");
    Ok(ProcessOutput {
        status,
        log: capture.text,
        truncated: capture.truncated,
        stopped,
    })
}

fn wait_for_exit(
    child: &mut Child,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
) -> std::io::Result<(ExitStatus, Option<StopReason>)> {
    let start = Instant::now();
    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return kill(child, StopReason::Cancelled);
        }
        let remaining = match timeout {
            Some(limit) => {
                let elapsed = start.elapsed();
                if elapsed >= limit {
                    return kill(child, StopReason::TimedOut);
                }
                Some(limit - elapsed)
            }
            None => None,
        };
        let slice = match (remaining, cancel) {
            (Some(remaining), Some(_)) => remaining.min(CANCEL_POLL_INTERVAL),
            (Some(remaining), None) => remaining,
            (None, Some(_)) => CANCEL_POLL_INTERVAL,
            (None, None) => return Ok((child.wait()?, None)),
        };
        if let Some(status) = child.wait_timeout(slice)? {
            return Ok((status, None));
        }
    }
}

fn kill(child: &mut Child, reason: StopReason) -> std::io::Result<(ExitStatus, Option<StopReason>)> {
    warn!(?reason, "stopping command");
    child.kill()?;
    let status = child.wait()?;
    Ok((status, Some(reason)))
}

/// Size-bounded, line-granular capture of combined output.
struct Capture {
    text: String,
    limit: usize,
    truncated: usize,
}

impl Capture {
    fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
            truncated: 0,
        }
    }

    fn push(&mut self, line: &str) {
        let needed = line.len() + 1;
        if self.text.len() + needed <= self.limit {
            self.text.push_str(line);
            self.text.push('\n');
        } else {
            self.truncated += needed;
        }
    }
}

enum Chunk {
    Line(String),
    Failed(std::io::Error),
}

/// Read `reader` line by line on a detached thread until EOF or until nobody listens.
fn spawn_reader<R: Read + Send + 'static>(reader: R, tx: Sender<Chunk>) {
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let line = text.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(Chunk::Line(line)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx.send(Chunk::Failed(err));
                    break;
                }
            }
        }
    });
}

/// Pass lines to `sink` and `Capture` until both readers hang up, or until the
/// child has exited and the pipes stay quiet for [`DRAIN_GRACE`].
fn forward(
    rx: &Receiver<Chunk>,
    sink: &dyn LogSink,
    limit: usize,
    exited: &AtomicBool,
) -> (Capture, Option<std::io::Error>) {
    let mut capture = Capture::new(limit);
    let mut failure = None;
    let mut quiet_since: Option<Instant> = None;
    loop {
        match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok(Chunk::Line(line)) => {
                quiet_since = None;
                sink.line(&line);
                capture.push(&line);
            }
            Ok(Chunk::Failed(err)) => {
                if failure.is_none() {
                    failure = Some(err);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if !exited.load(Ordering::SeqCst) {
                    continue;
                }
                let quiet = *quiet_since.get_or_insert_with(Instant::now);
                if quiet.elapsed() >= DRAIN_GRACE {
                    warn!("output pipes still open after exit, detaching readers");
                    break;
                }
            }
        }
    }
    (capture, failure)
}
