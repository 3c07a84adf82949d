//! End-to-end tests against a real child process.

#![cfg(unix)]

use std::time::Duration;

use tokio::sync::mpsc;

use ucicon::engine::{Spawner, WorkerEvent};
use ucicon::headless;
use ucicon::probe::NativeHost;
use ucicon::session::{Alert, EngineSession, SessionStatus};

use crate::fixtures::{next_event, ScriptEngine, TestHost};

/// Test: Liveness over a real pipe
/// Given the scripted engine
/// When the session mounts and the user sends `uci`
/// Then `readyok` arrives first and the `uci` reply follows in order
#[tokio::test]
async fn test_liveness_and_uci_over_process() {
    let engine = ScriptEngine::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = EngineSession::new("isready", true);
    assert!(session
        .mount(&TestHost::capable(), &engine.spawner(), tx)
        .is_none());
    assert_eq!(session.status(), SessionStatus::Loading);

    session.on_event(next_event(&mut rx).await);
    assert_eq!(session.status(), SessionStatus::Ready);
    assert_eq!(session.transcript().text(), "readyok\n");

    let mut pending = "uci".to_string();
    assert!(session.send(&mut pending));
    session.on_event(next_event(&mut rx).await);
    session.on_event(next_event(&mut rx).await);
    assert_eq!(
        session.transcript().text(),
        "readyok\nid name scripted\nuciok\n"
    );

    session.unmount();
}

/// Test: Engine crash
/// Given a ready session on the scripted engine
/// When the engine writes to stderr and exits
/// Then an error and an exit are both reported and the session fails
#[tokio::test]
async fn test_crash_reports_error_and_exit() {
    let engine = ScriptEngine::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = EngineSession::new("isready", true);
    session.mount(&TestHost::capable(), &engine.spawner(), tx);
    session.on_event(next_event(&mut rx).await);

    let mut pending = "crash".to_string();
    assert!(session.send(&mut pending));

    // Collect first: feeding the exit to the session drops the worker, which
    // stops the stderr reader.
    let mut events: Vec<WorkerEvent> = Vec::new();
    while !(events.iter().any(|e| matches!(e, WorkerEvent::Error(_)))
        && events.iter().any(|e| matches!(e, WorkerEvent::Exited(_))))
    {
        events.push(next_event(&mut rx).await);
    }

    assert!(events.contains(&WorkerEvent::Error("fatal: crash requested".to_string())));
    assert!(events.contains(&WorkerEvent::Exited(Some(7))));

    let alerts: Vec<Alert> = events
        .into_iter()
        .filter_map(|event| session.on_event(event))
        .collect();
    assert!(alerts.contains(&Alert::EngineError));
    assert!(alerts.contains(&Alert::EngineExited));
    assert_eq!(session.status(), SessionStatus::Failed);
}

#[test]
fn test_label_is_program_name() {
    let engine = ScriptEngine::new();
    assert_eq!(engine.spawner().label(), "sh");
}

/// Test: Headless relay
/// Given the scripted engine behind the pipe relay
/// When two commands are piped in and the input closes
/// Then every reply is written out and the relay ends on idle
#[tokio::test]
async fn test_pipe_relay_against_process() {
    let engine = ScriptEngine::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = EngineSession::new("isready", true);
    session.mount(&NativeHost::new(), &engine.spawner(), tx);

    let input: &[u8] = b"uci\nfoo\n";
    let mut output = Vec::new();
    let summary = headless::relay(
        &mut session,
        input,
        &mut output,
        &mut rx,
        Duration::from_millis(300),
    )
    .await
    .unwrap();
    session.unmount();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        "readyok\nid name scripted\nuciok\nunknown command: foo\n"
    );
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.status, SessionStatus::Ready);
}
