//! Messages for the TEA (The Elm Architecture) pattern.
//!
//! Messages come from the terminal or from the engine worker.

use crossterm::event::KeyEvent;

use crate::engine::WorkerEvent;

#[derive(Debug)]
pub enum Message {
    Key(KeyEvent),
    Resize(u16, u16),
    Worker(WorkerEvent),
}

impl From<WorkerEvent> for Message {
    fn from(event: WorkerEvent) -> Self {
        Message::Worker(event)
    }
}
