use crate::session::{Alert, SessionStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Render thread frame budget (60fps).
pub const FRAME_DURATION: Duration = Duration::from_micros(16_666);

/// The examples menu as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuView {
    pub items: Vec<String>,
    pub selected: usize,
}

static VERSION_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn next_version() -> u64 {
    VERSION_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Immutable snapshot handed to the render thread.
#[derive(Debug, Clone)]
pub struct RenderState {
    pub version: u64,
    pub engine_name: String,
    pub status: SessionStatus,
    pub input: String,
    pub input_enabled: bool,
    pub auto_scroll: bool,
    /// Visible rows of the wrapped transcript.
    pub transcript: Vec<String>,
    /// Wrapped rows in the whole transcript.
    pub transcript_len: usize,
    /// Row index of `transcript[0]`.
    pub first_line: usize,
    pub menu: Option<MenuView>,
    pub alert: Option<Alert>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            version: 0,
            engine_name: String::new(),
            status: SessionStatus::Waiting,
            input: String::new(),
            input_enabled: false,
            auto_scroll: true,
            transcript: Vec::new(),
            transcript_len: 0,
            first_line: 0,
            menu: None,
            alert: None,
        }
    }
}

impl RenderState {
    /// Whether rows exist below the visible window.
    pub fn has_more_below(&self) -> bool {
        self.first_line + self.transcript.len() < self.transcript_len
    }
}
