//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Hosts with individual capabilities switched off
//! - A spawner that records what the session posts
//! - A small shell-script engine speaking just enough UCI

use std::cell::Cell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use ucicon::engine::{ProcessSpawner, Spawner, Worker, WorkerEvent};
use ucicon::probe::{BufferKind, Host, NativeHost, SharedMemory};
use ucicon::{Error, Result};

/// A host whose capabilities can be switched off one at a time.
pub struct TestHost {
    pub module_engine: bool,
    pub shared_buffer: bool,
    pub atomics: bool,
    pub cross_thread: bool,
    pub message_passing: bool,
    /// How many times `alloc_shared` ran.
    pub allocations: Cell<usize>,
}

impl TestHost {
    pub fn capable() -> Self {
        Self {
            module_engine: true,
            shared_buffer: true,
            atomics: true,
            cross_thread: true,
            message_passing: true,
            allocations: Cell::new(0),
        }
    }

    pub fn without_shared_buffer() -> Self {
        Self {
            shared_buffer: false,
            ..Self::capable()
        }
    }
}

impl Host for TestHost {
    fn has_module_engine(&self) -> bool {
        self.module_engine
    }

    fn validate_module(&self, bytes: &[u8]) -> bool {
        NativeHost::new().validate_module(bytes)
    }

    fn has_shared_buffer(&self) -> bool {
        self.shared_buffer
    }

    fn has_atomics(&self) -> bool {
        self.atomics
    }

    fn alloc_shared(&self, initial: usize, maximum: usize) -> Result<SharedMemory> {
        self.allocations.set(self.allocations.get() + 1);
        let kind = if self.cross_thread {
            BufferKind::Shared
        } else {
            BufferKind::Local
        };
        SharedMemory::new(initial, maximum, kind)
    }

    fn post_to_self(&self, _memory: &SharedMemory) -> Result<()> {
        if self.message_passing {
            Ok(())
        } else {
            Err(Error::Capability("region cannot be posted".to_string()))
        }
    }
}

/// What a [`RecordingSpawner`] saw.
#[derive(Default)]
pub struct Recording {
    pub posted: Mutex<Vec<String>>,
    pub spawns: AtomicUsize,
    pub terminated: AtomicBool,
}

impl Recording {
    pub fn posted(&self) -> Vec<String> {
        self.posted.lock().unwrap().clone()
    }

    pub fn spawns(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

pub struct RecordingWorker(Arc<Recording>);

impl Worker for RecordingWorker {
    fn post(&mut self, line: &str) -> Result<()> {
        self.0.posted.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn terminate(&mut self) {
        self.0.terminated.store(true, Ordering::SeqCst);
    }
}

/// Spawns workers that never answer; replies are injected by the test.
#[derive(Default)]
pub struct RecordingSpawner {
    pub recording: Arc<Recording>,
}

impl RecordingSpawner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Spawner for RecordingSpawner {
    fn spawn(&self, _events: mpsc::UnboundedSender<WorkerEvent>) -> Result<Box<dyn Worker>> {
        self.recording.spawns.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingWorker(self.recording.clone())))
    }

    fn label(&self) -> String {
        "recording".to_string()
    }
}

const SCRIPT: &str = r#"#!/bin/sh
while IFS= read -r line; do
  case "$line" in
    isready) echo readyok ;;
    uci) echo "id name scripted"; echo uciok ;;
    crash) echo "fatal: crash requested" >&2; exit 7 ;;
    quit) exit 0 ;;
    *) echo "unknown command: $line" ;;
  esac
done
"#;

/// A shell script that answers `isready` and `uci`, and dies on `crash`.
pub struct ScriptEngine {
    _dir: TempDir,
    pub path: PathBuf,
}

impl ScriptEngine {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("engine.sh");
        std::fs::write(&path, SCRIPT).expect("Failed to write engine script");
        Self { _dir: dir, path }
    }

    pub fn spawner(&self) -> ProcessSpawner {
        ProcessSpawner::new("sh", vec![self.path.to_string_lossy().into_owned()])
    }
}

/// Wait for the next worker event, failing the test after a generous timeout.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<WorkerEvent>) -> WorkerEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timed out waiting for a worker event")
        .expect("Worker event channel closed")
}
