//! Headless relay: commands from a line stream to the engine, engine output to
//! a writer. Used by `ucicon pipe`.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::engine::WorkerEvent;
use crate::session::{EngineSession, SessionStatus};
use crate::{ulog, ulog_warn, Result};

/// How long to keep relaying engine output after the input ends.
pub const DEFAULT_IDLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySummary {
    pub sent: usize,
    pub received: usize,
    pub status: SessionStatus,
}

/// Relay until the engine goes away, or the input has ended and the engine has
/// been quiet for `idle`.
///
/// Input lines are read only while the session accepts input, so the first
/// command waits for the engine's first reply like the interactive console.
pub async fn relay<R, W>(
    session: &mut EngineSession,
    input: R,
    output: &mut W,
    events: &mut mpsc::UnboundedReceiver<WorkerEvent>,
    idle: Duration,
) -> Result<RelaySummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut input_open = true;
    let mut sent = 0;
    let mut received = 0;

    loop {
        let accepting = input_open && session.input_enabled();
        tokio::select! {
            next = lines.next_line(), if accepting => match next? {
                Some(mut command) => {
                    if session.send(&mut command) {
                        sent += 1;
                    }
                }
                None => {
                    ulog!("Relay input closed after {} commands", sent);
                    input_open = false;
                }
            },
            event = events.recv() => {
                let Some(event) = event else { break };
                let before = session.transcript().len();
                let alert = session.on_event(event);
                if let Some(line) = session.transcript().lines().get(before) {
                    output.write_all(line.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                    output.flush().await?;
                    received += 1;
                }
                if let Some(alert) = alert {
                    ulog_warn!("Relay alert: {}", alert.message());
                    eprintln!("{}", alert.message());
                }
                if session.status() == SessionStatus::Failed {
                    break;
                }
            },
            _ = tokio::time::sleep(idle), if !input_open => break,
        }
    }

    Ok(RelaySummary {
        sent,
        received,
        status: session.status(),
    })
}
