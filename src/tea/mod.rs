//! The Elm Architecture (TEA) for the ucicon TUI.
//!
//! - `Model`: console state, including the engine session
//! - `Message`: keys, resizes and worker events
//! - `Command`: side effects for the logic thread
//! - `update`: applies a message to the model

pub mod command;
pub mod message;
pub mod model;
pub mod update;

pub use command::Command;
pub use message::Message;
pub use model::{ExamplesMenu, Model, ScrollPosition};
pub use update::update;
