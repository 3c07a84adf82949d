//! Commands for the TEA (The Elm Architecture) pattern.
//!
//! Sending to the engine is a non-blocking queue push done inside `update`,
//! so the only effect left for the runtime is leaving.

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Unmount the session and leave the TUI.
    Quit,
}
