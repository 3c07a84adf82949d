//! Model for the TEA (The Elm Architecture) pattern.
//!
//! The model owns the engine session and everything the console shows around
//! it: the pending input, the examples menu, the open alert and the transcript
//! viewport.
//!
//! The viewport scrolls over display rows, not transcript lines: each line is
//! wrapped to the pane width once, as it arrives, and rewrapped on resize.

use tokio::sync::mpsc;

use crate::config::Config;
use crate::engine::{Spawner, WorkerEvent};
use crate::probe::Host;
use crate::render::{next_version, MenuView, RenderState};
use crate::session::{Alert, EngineSession};

/// Where the transcript viewport sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollPosition {
    /// Pinned to the last line.
    #[default]
    Bottom,
    /// First visible row, clamped when rendered.
    Line(usize),
}

/// The open examples menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamplesMenu {
    pub selected: usize,
}

pub struct Model {
    pub session: EngineSession,
    pub engine_name: String,

    /// Next command to send.
    pub input: String,
    pub examples: Vec<String>,
    pub menu: Option<ExamplesMenu>,
    pub alert: Option<Alert>,

    pub scroll: ScrollPosition,
    /// Rows available to the transcript pane.
    pub viewport_rows: usize,
    /// Text columns inside the transcript pane. `usize::MAX` until the
    /// terminal size is known.
    pub viewport_cols: usize,

    /// Transcript wrapped to `viewport_cols`.
    rows: Vec<String>,
    /// Transcript lines already in `rows`.
    wrapped_lines: usize,

    pub dirty: bool,
}

impl Model {
    pub fn new(config: &Config, engine_name: impl Into<String>, viewport_rows: usize) -> Self {
        Self {
            session: EngineSession::new(config.liveness_command(), config.auto_scroll),
            engine_name: engine_name.into(),
            input: String::new(),
            examples: config.examples(),
            menu: None,
            alert: None,
            scroll: ScrollPosition::Bottom,
            viewport_rows,
            viewport_cols: usize::MAX,
            rows: Vec::new(),
            wrapped_lines: 0,
            dirty: true,
        }
    }

    /// Mount the session; a returned alert is shown immediately.
    pub fn mount(
        &mut self,
        host: &dyn Host,
        spawner: &dyn Spawner,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) {
        if let Some(alert) = self.session.mount(host, spawner, events) {
            self.alert = Some(alert);
        }
        self.dirty = true;
    }

    /// Resize the transcript pane. A width change rewraps everything and keeps
    /// a frozen viewport on the same transcript line.
    pub fn set_viewport(&mut self, rows: usize, cols: usize) {
        self.viewport_rows = rows;
        if cols != self.viewport_cols {
            let anchor = match self.scroll {
                ScrollPosition::Line(_) => Some(self.line_at_row(self.top())),
                ScrollPosition::Bottom => None,
            };
            self.viewport_cols = cols;
            self.rows.clear();
            self.wrapped_lines = 0;
            self.sync_rows();
            if let Some(line) = anchor {
                self.scroll = ScrollPosition::Line(self.row_of_line(line));
            }
        }
        self.dirty = true;
    }

    /// Wrap transcript lines that arrived since the last call.
    pub fn sync_rows(&mut self) {
        let lines = self.session.transcript().lines();
        for line in &lines[self.wrapped_lines..] {
            self.rows.extend(wrap_line(line, self.viewport_cols));
        }
        self.wrapped_lines = lines.len();
    }

    /// Display rows of the wrapped transcript.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Largest valid first row for the current transcript and viewport.
    pub fn max_top(&self) -> usize {
        self.rows.len().saturating_sub(self.viewport_rows)
    }

    /// First visible row.
    pub fn top(&self) -> usize {
        match self.scroll {
            ScrollPosition::Bottom => self.max_top(),
            ScrollPosition::Line(n) => n.min(self.max_top()),
        }
    }

    /// Transcript line that display row `row` belongs to.
    fn line_at_row(&self, row: usize) -> usize {
        let mut rows = 0;
        for (idx, line) in self.session.transcript().lines()[..self.wrapped_lines]
            .iter()
            .enumerate()
        {
            rows += wrapped_height(line, self.viewport_cols);
            if rows > row {
                return idx;
            }
        }
        self.wrapped_lines
    }

    /// First display row of transcript line `line`.
    fn row_of_line(&self, line: usize) -> usize {
        self.session.transcript().lines()[..line.min(self.wrapped_lines)]
            .iter()
            .map(|l| wrapped_height(l, self.viewport_cols))
            .sum()
    }

    /// Snapshot for the render thread. Only the visible rows are copied.
    pub fn snapshot(&self) -> RenderState {
        let top = self.top();
        let end = (top + self.viewport_rows).min(self.rows.len());

        RenderState {
            version: next_version(),
            engine_name: self.engine_name.clone(),
            status: self.session.status(),
            input: self.input.clone(),
            input_enabled: self.session.input_enabled(),
            auto_scroll: self.session.auto_scroll(),
            transcript: self.rows[top..end].to_vec(),
            transcript_len: self.rows.len(),
            first_line: top,
            menu: self.menu.map(|m| MenuView {
                items: self.examples.clone(),
                selected: m.selected,
            }),
            alert: self.alert,
        }
    }
}

/// Split `line` into chunks of at most `cols` characters. An empty line still
/// takes one row.
pub fn wrap_line(line: &str, cols: usize) -> Vec<String> {
    let cols = cols.max(1);
    if line.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars.chunks(cols).map(|c| c.iter().collect()).collect()
}

fn wrapped_height(line: &str, cols: usize) -> usize {
    line.chars().count().div_ceil(cols.max(1)).max(1)
}
