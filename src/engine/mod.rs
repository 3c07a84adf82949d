//! Background engine workers.
//!
//! A worker is an independent thread of control hosting the engine. The
//! controller talks to it only through [`Worker::post`], and hears back through
//! the [`WorkerEvent`] channel handed over at spawn time. Lines are opaque text
//! in both directions.

pub mod process;

use tokio::sync::mpsc;

use crate::Result;

pub use process::{ProcessSpawner, ProcessWorker};

/// Something a worker reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// One line of engine output.
    Line(String),
    /// The worker reported a runtime error.
    Error(String),
    /// The worker is gone; carries the exit code when one is known.
    Exited(Option<i32>),
}

/// Handle to a spawned worker.
pub trait Worker {
    /// Queue one command line. Never blocks.
    fn post(&mut self, line: &str) -> Result<()>;

    /// Stop the worker, discarding any in-flight work.
    fn terminate(&mut self);
}

/// Creates workers that report on `events`.
pub trait Spawner {
    fn spawn(&self, events: mpsc::UnboundedSender<WorkerEvent>) -> Result<Box<dyn Worker>>;

    /// Short name for the status line.
    fn label(&self) -> String;
}
