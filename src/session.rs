//! Engine session controller.
//!
//! Owns the one worker of a session, relays commands to it, keeps the
//! transcript of everything it printed, and tracks the status label:
//!
//! ```text
//! Waiting --mount, probe ok--> Loading --first line--> Ready
//!    |                            |                      |
//!    +--probe fails: stays, alert |                      |
//!                                 +------exit------------+--> Failed
//! ```
//!
//! Ready never regresses while the worker is alive. Worker error reports raise
//! an alert but leave the status alone. After `unmount` nothing changes.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::engine::{Spawner, Worker, WorkerEvent};
use crate::probe::{self, Host};
use crate::{ulog, ulog_debug, ulog_error, ulog_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionStatus {
    Loading,
    Ready,
    #[default]
    Waiting,
    Failed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Loading => "Loading",
            SessionStatus::Ready => "Ready",
            SessionStatus::Waiting => "Waiting",
            SessionStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// A blocking message for the user. Carries no detail; the log has the
/// specifics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    /// The host cannot run a multi-threaded engine worker.
    Unsupported,
    /// The engine reported an error.
    EngineError,
    /// The engine process ended.
    EngineExited,
}

impl Alert {
    pub fn message(&self) -> &'static str {
        match self {
            Alert::Unsupported => {
                "Multi-threaded engine execution is not supported on this host, please update or switch the host"
            }
            Alert::EngineError => "Some error occurred on the engine side, please try again",
            Alert::EngineExited => "The engine has stopped, restart the console to try again",
        }
    }
}

/// Append-only record of engine output, one entry per line received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Every line followed by a newline, in arrival order.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

pub struct EngineSession {
    status: SessionStatus,
    transcript: Transcript,
    worker: Option<Box<dyn Worker>>,
    auto_scroll: bool,
    mounted: bool,
    unmounted: bool,
    liveness_command: String,
}

impl EngineSession {
    pub fn new(liveness_command: impl Into<String>, auto_scroll: bool) -> Self {
        Self {
            status: SessionStatus::Waiting,
            transcript: Transcript::new(),
            worker: None,
            auto_scroll,
            mounted: false,
            unmounted: false,
            liveness_command: liveness_command.into(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted
    }

    /// Whether the input line accepts keys and Enter submits.
    pub fn input_enabled(&self) -> bool {
        self.status == SessionStatus::Ready && self.worker.is_some() && !self.unmounted
    }

    /// Probe the host and, if it is capable, spawn the one worker.
    ///
    /// Runs once per session; later calls do nothing. A failed probe returns
    /// the alert to show and leaves the session in Waiting for good. A failed
    /// spawn is only logged: the session sits in Loading with no worker.
    pub fn mount(
        &mut self,
        host: &dyn Host,
        spawner: &dyn Spawner,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) -> Option<Alert> {
        if self.mounted || self.unmounted {
            ulog_debug!("EngineSession::mount ignored: already mounted");
            return None;
        }
        self.mounted = true;

        if !probe::probe(host) {
            ulog_warn!("Host lacks multi-threaded engine support; not spawning");
            return Some(Alert::Unsupported);
        }

        self.status = SessionStatus::Loading;
        match spawner.spawn(events) {
            Ok(mut worker) => {
                if let Err(e) = worker.post(&self.liveness_command) {
                    ulog_error!("Liveness check not delivered: {}", e);
                }
                self.worker = Some(worker);
                ulog!("Engine '{}' spawned, status=Loading", spawner.label());
            }
            Err(e) => {
                ulog_error!("Engine '{}' failed to spawn: {}", spawner.label(), e);
            }
        }
        None
    }

    /// Route one worker event. Returns an alert to show, if any.
    pub fn on_event(&mut self, event: WorkerEvent) -> Option<Alert> {
        match event {
            WorkerEvent::Line(line) => {
                self.on_message(line);
                None
            }
            WorkerEvent::Error(detail) => self.on_error(&detail),
            WorkerEvent::Exited(code) => self.on_exit(code),
        }
    }

    pub fn on_message(&mut self, line: String) {
        if self.unmounted || self.worker.is_none() {
            ulog_debug!("Dropping engine line without a live worker");
            return;
        }
        self.transcript.append(line);
        if self.status != SessionStatus::Ready {
            self.status = SessionStatus::Ready;
            ulog!("Engine ready");
        }
    }

    pub fn on_error(&mut self, detail: &str) -> Option<Alert> {
        if self.unmounted {
            return None;
        }
        ulog_warn!("Engine error: {}", detail);
        Some(Alert::EngineError)
    }

    pub fn on_exit(&mut self, code: Option<i32>) -> Option<Alert> {
        if self.unmounted || self.worker.is_none() {
            return None;
        }
        ulog_warn!("Engine exited with {:?}; session failed", code);
        self.worker = None;
        self.status = SessionStatus::Failed;
        Some(Alert::EngineExited)
    }

    /// Forward `pending` verbatim and clear it. With no live worker this only
    /// logs and leaves `pending` untouched. Returns whether it was forwarded.
    pub fn send(&mut self, pending: &mut String) -> bool {
        let Some(worker) = self.worker.as_mut() else {
            ulog!("send dropped: no engine worker");
            return false;
        };
        if let Err(e) = worker.post(pending) {
            ulog_error!("Failed to post {:?}: {}", pending, e);
            return false;
        }
        pending.clear();
        true
    }

    pub fn toggle_auto_scroll(&mut self) -> bool {
        self.auto_scroll = !self.auto_scroll;
        ulog_debug!("auto_scroll={}", self.auto_scroll);
        self.auto_scroll
    }

    /// Terminate the worker. Final: later events are ignored.
    pub fn unmount(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.terminate();
        }
        self.unmounted = true;
        ulog_debug!("EngineSession unmounted");
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.terminate();
        }
    }
}
