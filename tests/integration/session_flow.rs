//! Session lifecycle integration tests.
//!
//! Worker replies are injected through the event channel handed to `mount`,
//! so these tests are deterministic.

use tokio::sync::mpsc;

use ucicon::engine::WorkerEvent;
use ucicon::session::{Alert, EngineSession, SessionStatus};

use crate::fixtures::{RecordingSpawner, TestHost};

fn mounted() -> (
    EngineSession,
    RecordingSpawner,
    mpsc::UnboundedReceiver<WorkerEvent>,
) {
    let spawner = RecordingSpawner::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let mut session = EngineSession::new("isready", true);
    assert!(session.mount(&TestHost::capable(), &spawner, tx).is_none());
    (session, spawner, rx)
}

fn line(text: &str) -> WorkerEvent {
    WorkerEvent::Line(text.to_string())
}

/// Test: Liveness reply then a user command
/// Given a capable host
/// When the engine answers `readyok`, then the user sends `uci`
/// Then the transcript holds both replies in arrival order
#[test]
fn test_ready_then_uci_round() {
    let (mut session, spawner, _rx) = mounted();

    assert_eq!(session.status(), SessionStatus::Loading);
    assert_eq!(spawner.recording.posted(), vec!["isready"]);
    assert!(!session.input_enabled());

    session.on_event(line("readyok"));
    assert_eq!(session.status(), SessionStatus::Ready);
    assert_eq!(session.transcript().text(), "readyok\n");
    assert!(session.input_enabled());

    let mut pending = "uci".to_string();
    assert!(session.send(&mut pending));
    assert!(pending.is_empty());
    assert_eq!(spawner.recording.posted(), vec!["isready", "uci"]);

    session.on_event(line("uciok"));
    assert_eq!(session.transcript().text(), "readyok\nuciok\n");
}

/// Test: Missing shared buffer
/// Given a host without a cross-thread buffer type
/// When the session mounts
/// Then nothing is allocated or spawned and an alert is raised
#[test]
fn test_unsupported_host_never_spawns() {
    let host = TestHost::without_shared_buffer();
    let spawner = RecordingSpawner::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut session = EngineSession::new("isready", true);

    assert_eq!(session.mount(&host, &spawner, tx), Some(Alert::Unsupported));
    assert_eq!(host.allocations.get(), 0);
    assert_eq!(spawner.recording.spawns(), 0);
    assert_eq!(session.status(), SessionStatus::Waiting);
    assert!(!session.has_worker());
    assert!(!session.input_enabled());
}

#[test]
fn test_each_gating_failure_is_unsupported() {
    let hosts = [
        TestHost {
            module_engine: false,
            ..TestHost::capable()
        },
        TestHost {
            atomics: false,
            ..TestHost::capable()
        },
        TestHost {
            cross_thread: false,
            ..TestHost::capable()
        },
        TestHost {
            message_passing: false,
            ..TestHost::capable()
        },
    ];

    for host in hosts {
        let spawner = RecordingSpawner::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = EngineSession::new("isready", true);
        assert_eq!(session.mount(&host, &spawner, tx), Some(Alert::Unsupported));
        assert_eq!(spawner.recording.spawns(), 0);
    }
}

#[test]
fn test_mount_spawns_once() {
    let (mut session, spawner, _rx) = mounted();
    let (tx, _rx2) = mpsc::unbounded_channel();
    assert!(session.mount(&TestHost::capable(), &spawner, tx).is_none());
    assert_eq!(spawner.recording.spawns(), 1);
    assert_eq!(spawner.recording.posted(), vec!["isready"]);
}

/// Test: Output ordering
/// Given a ready session
/// When a burst of `info` lines arrives
/// Then every line is kept, in order
#[test]
fn test_lines_kept_in_arrival_order() {
    let (mut session, _spawner, _rx) = mounted();
    let burst: Vec<String> = (1..=50)
        .map(|d| format!("info depth {} score cp {}", d, d * 3))
        .collect();
    for text in &burst {
        session.on_event(line(text));
    }
    assert_eq!(session.transcript().lines(), burst.as_slice());
}

#[test]
fn test_send_without_worker_keeps_pending() {
    let mut session = EngineSession::new("isready", true);
    let mut pending = "go depth 15".to_string();
    assert!(!session.send(&mut pending));
    assert_eq!(pending, "go depth 15");
}

#[test]
fn test_empty_command_is_forwarded() {
    let (mut session, spawner, _rx) = mounted();
    session.on_event(line("readyok"));
    let mut pending = String::new();
    assert!(session.send(&mut pending));
    assert_eq!(spawner.recording.posted(), vec!["isready", ""]);
}

/// Test: Engine death
/// Given a ready session
/// When the worker exits
/// Then the session fails for good and input is disabled
#[test]
fn test_exit_fails_session() {
    let (mut session, spawner, _rx) = mounted();
    session.on_event(line("readyok"));

    assert_eq!(
        session.on_event(WorkerEvent::Exited(Some(1))),
        Some(Alert::EngineExited)
    );
    assert_eq!(session.status(), SessionStatus::Failed);
    assert!(!session.input_enabled());

    session.on_event(line("late"));
    assert_eq!(session.transcript().text(), "readyok\n");
    assert_eq!(session.status(), SessionStatus::Failed);

    let mut pending = "uci".to_string();
    assert!(!session.send(&mut pending));
    assert_eq!(spawner.recording.posted(), vec!["isready"]);
}

#[test]
fn test_error_alerts_without_status_change() {
    let (mut session, _spawner, _rx) = mounted();
    session.on_event(line("readyok"));
    assert_eq!(
        session.on_event(WorkerEvent::Error("bad option".to_string())),
        Some(Alert::EngineError)
    );
    assert_eq!(session.status(), SessionStatus::Ready);
}

#[test]
fn test_unmount_terminates_and_ignores_late_output() {
    let (mut session, spawner, _rx) = mounted();
    session.on_event(line("readyok"));
    session.unmount();

    assert!(spawner.recording.terminated());
    assert!(session.is_unmounted());

    session.on_event(line("bestmove e2e4"));
    assert_eq!(session.transcript().len(), 1);
    assert!(session
        .on_event(WorkerEvent::Error("late".to_string()))
        .is_none());
}

#[test]
fn test_drop_terminates_worker() {
    let (session, spawner, _rx) = mounted();
    drop(session);
    assert!(spawner.recording.terminated());
}
