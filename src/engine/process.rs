//! Engine worker running as a child process.
//!
//! Three tasks serve one child: a writer draining the command queue into
//! stdin, a stderr reader reporting errors, and a supervisor forwarding stdout
//! lines and reporting the exit. All three stop when the worker's
//! cancellation token fires.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{ulog, ulog_debug, ulog_error, ulog_trace, Error, Result};

use super::{Spawner, Worker, WorkerEvent};

/// Spawns the configured engine command line.
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
    program: String,
    args: Vec<String>,
}

impl ProcessSpawner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a command line already split into program and arguments.
    pub fn from_command(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Validation("empty engine command".to_string()))?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Full path of the engine binary, searched on `PATH` when bare.
    pub fn resolve(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|_| Error::EngineNotFound(self.program.clone()))
    }
}

impl Spawner for ProcessSpawner {
    fn spawn(&self, events: mpsc::UnboundedSender<WorkerEvent>) -> Result<Box<dyn Worker>> {
        let program = self.resolve()?;
        ulog!("Spawning engine: {} {:?}", program.display(), self.args);

        let mut child = Command::new(&program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or(Error::WorkerClosed)?;
        let stdout = child.stdout.take().ok_or(Error::WorkerClosed)?;
        let stderr = child.stderr.take().ok_or(Error::WorkerClosed)?;
        let pid = child.id();

        let cancel = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(pump_commands(stdin, command_rx, cancel.clone()));
        tokio::spawn(read_errors(stderr, events.clone(), cancel.clone()));
        tokio::spawn(supervise(child, stdout, events, cancel.clone()));

        Ok(Box::new(ProcessWorker {
            commands: command_tx,
            cancel,
            pid,
        }))
    }

    fn label(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.clone())
    }
}

pub struct ProcessWorker {
    commands: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
    pid: Option<u32>,
}

impl Worker for ProcessWorker {
    fn post(&mut self, line: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::WorkerClosed);
        }
        self.commands
            .send(line.to_string())
            .map_err(|_| Error::WorkerClosed)
    }

    fn terminate(&mut self) {
        if !self.cancel.is_cancelled() {
            ulog_debug!("ProcessWorker::terminate pid={:?}", self.pid);
            self.cancel.cancel();
        }
    }
}

impl Drop for ProcessWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

async fn pump_commands(
    mut stdin: ChildStdin,
    mut commands: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = commands.recv() => {
                let Some(line) = next else { break };
                ulog_trace!("engine <- {}", line);
                if let Err(e) = write_line(&mut stdin, &line).await {
                    ulog_error!("Failed to write to engine: {}", e);
                    break;
                }
            }
        }
    }
}

async fn write_line(stdin: &mut ChildStdin, line: &str) -> std::io::Result<()> {
    stdin.write_all(line.as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await
}

/// Newline-delimited reader for engine pipes. Bytes that are not UTF-8 are
/// replaced instead of failing the stream, so one odd `id author` line cannot
/// end the transcript.
struct LossyLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LossyLines<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    /// Next line without its terminator, or `None` at end of stream. Partial
    /// reads stay in `buf`, so dropping the future in a `select!` loses
    /// nothing.
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }
        let line = decode_line(&self.buf);
        self.buf.clear();
        Ok(Some(line))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

async fn read_errors(
    stderr: ChildStderr,
    events: mpsc::UnboundedSender<WorkerEvent>,
    cancel: CancellationToken,
) {
    let mut lines = LossyLines::new(stderr);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = lines.next_line() => match next {
                Ok(Some(line)) => {
                    ulog_trace!("engine !! {}", line);
                    if events.send(WorkerEvent::Error(line)).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    ulog_error!("Engine stderr read failed: {}", e);
                    break;
                }
            }
        }
    }
}

async fn supervise(
    mut child: Child,
    stdout: ChildStdout,
    events: mpsc::UnboundedSender<WorkerEvent>,
    cancel: CancellationToken,
) {
    let mut lines = LossyLines::new(stdout);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    ulog_debug!("Engine kill: {}", e);
                }
                return;
            }
            next = lines.next_line() => match next {
                Ok(Some(line)) => {
                    ulog_trace!("engine -> {}", line);
                    if events.send(WorkerEvent::Line(line)).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = events.send(WorkerEvent::Error(e.to_string()));
                    break;
                }
            }
        }
    }

    let status = tokio::select! {
        _ = cancel.cancelled() => {
            let _ = child.kill().await;
            return;
        }
        status = child.wait() => status,
    };
    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            ulog_error!("Engine wait failed: {}", e);
            None
        }
    };
    ulog!("Engine exited: code={:?}", code);
    let _ = events.send(WorkerEvent::Exited(code));
}
