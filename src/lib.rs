pub mod config;
pub mod engine;
pub mod error;
pub mod headless;
pub mod log;
pub mod probe;
pub mod session;

// Decoupled game loop architecture
pub mod app;
pub mod render;
pub mod tea;
pub mod ui;

pub use error::{Error, Result};
pub use session::{Alert, EngineSession, SessionStatus, Transcript};
