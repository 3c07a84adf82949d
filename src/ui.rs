//! Terminal UI rendering for the ucicon console.
//!
//! Layout, top to bottom:
//! - input line (enabled only while the engine is Ready)
//! - auto-scroll toggle
//! - engine status line
//! - transcript pane
//! - keymap
//!
//! The examples menu and alerts are drawn as overlays. Rendering reads a
//! `RenderState` snapshot and never touches the model.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Wrap},
    Frame,
};

use crate::render::{MenuView, RenderState};
use crate::session::{Alert, SessionStatus};

const COLOR_TEXT_DIMMED: Color = Color::Gray;
const COLOR_TEXT_MUTED: Color = Color::DarkGray;

const COLOR_STATUS_READY: Color = Color::Green;
const COLOR_STATUS_LOADING: Color = Color::Yellow;
const COLOR_STATUS_WAITING: Color = Color::Gray;
const COLOR_STATUS_FAILED: Color = Color::Red;

const PLACEHOLDER: &str = "Enter UCI command here";

/// Rows taken by everything except the transcript text: three header lines,
/// the pane border and the keymap.
const CHROME_ROWS: u16 = 6;

/// Left and right border of the transcript pane.
const PANE_BORDER_COLS: u16 = 2;

const ALERT_WIDTH: u16 = 64;

/// Transcript rows that fit in a terminal `height` rows tall.
pub fn transcript_rows(height: u16) -> usize {
    height.saturating_sub(CHROME_ROWS) as usize
}

/// Text columns inside the transcript pane of a terminal `width` columns wide.
pub fn transcript_cols(width: u16) -> usize {
    width.saturating_sub(PANE_BORDER_COLS) as usize
}

/// What the keymap line should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeymapContext {
    Alert,
    Menu,
    Input,
    Disabled,
}

impl KeymapContext {
    pub fn from_render_state(state: &RenderState) -> Self {
        if state.alert.is_some() {
            KeymapContext::Alert
        } else if state.menu.is_some() {
            KeymapContext::Menu
        } else if state.input_enabled {
            KeymapContext::Input
        } else {
            KeymapContext::Disabled
        }
    }
}

struct Keybinding(&'static str, &'static str);

struct KeybindingGroup(Vec<Keybinding>);

fn keybindings_for_context(ctx: KeymapContext) -> Vec<KeybindingGroup> {
    let scroll = KeybindingGroup(vec![
        Keybinding("F2", "auto-scroll"),
        Keybinding("PgUp/PgDn", "scroll"),
    ]);
    let quit = KeybindingGroup(vec![Keybinding("Esc", "quit")]);

    match ctx {
        KeymapContext::Alert => vec![KeybindingGroup(vec![Keybinding("Enter", "dismiss")])],
        KeymapContext::Menu => vec![KeybindingGroup(vec![
            Keybinding("↑↓", "select"),
            Keybinding("Enter", "pick"),
            Keybinding("Esc", "close"),
        ])],
        KeymapContext::Input => vec![
            KeybindingGroup(vec![Keybinding("Enter", "send"), Keybinding("Tab", "examples")]),
            scroll,
            quit,
        ],
        KeymapContext::Disabled => vec![scroll, quit],
    }
}

pub fn draw(frame: &mut Frame, state: &RenderState) {
    let area = frame.area();

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .split(area);

    render_input(frame, state, chunks[0]);
    render_auto_scroll(frame, state, chunks[1]);
    render_status(frame, state, chunks[2]);
    render_transcript(frame, state, chunks[3]);
    render_keymap(frame, state, chunks[4]);

    if let Some(menu) = &state.menu {
        render_menu(frame, menu, area);
    }
    if let Some(alert) = state.alert {
        render_alert(frame, alert, area);
    }
}

fn render_input(frame: &mut Frame, state: &RenderState, area: Rect) {
    let prompt_style = if state.input_enabled {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLOR_TEXT_MUTED)
    };

    let mut spans = vec![Span::styled("> ", prompt_style)];
    if state.input.is_empty() {
        spans.push(Span::styled(
            PLACEHOLDER,
            Style::default().fg(COLOR_TEXT_MUTED),
        ));
    } else {
        let input_style = if state.input_enabled {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(COLOR_TEXT_MUTED)
        };
        spans.push(Span::styled(state.input.clone(), input_style));
    }
    if state.input_enabled {
        spans.push(Span::styled(
            "_",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::SLOW_BLINK),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_auto_scroll(frame: &mut Frame, state: &RenderState, area: Rect) {
    let mark = if state.auto_scroll { "x" } else { " " };
    let line = Line::from(vec![
        Span::styled("- auto-scroll : ", Style::default().fg(COLOR_TEXT_DIMMED)),
        Span::raw(format!("[{}]", mark)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

pub fn status_color(status: SessionStatus) -> Color {
    match status {
        SessionStatus::Ready => COLOR_STATUS_READY,
        SessionStatus::Loading => COLOR_STATUS_LOADING,
        SessionStatus::Waiting => COLOR_STATUS_WAITING,
        SessionStatus::Failed => COLOR_STATUS_FAILED,
    }
}

fn render_status(frame: &mut Frame, state: &RenderState, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            format!("- {} state : ", state.engine_name),
            Style::default().fg(COLOR_TEXT_DIMMED),
        ),
        Span::styled(
            state.status.to_string(),
            Style::default().fg(status_color(state.status)),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Rows arrive wrapped to the pane width, so nothing is clipped here.
fn render_transcript(frame: &mut Frame, state: &RenderState, area: Rect) {
    let mut block = Block::bordered().border_style(Style::default().fg(COLOR_TEXT_MUTED));
    if state.transcript_len > 0 {
        block = block.title_bottom(
            Line::from(Span::styled(
                position_label(state),
                Style::default().fg(COLOR_TEXT_MUTED),
            ))
            .right_aligned(),
        );
    }

    let lines: Vec<Line> = state
        .transcript
        .iter()
        .map(|l| Line::raw(l.clone()))
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// "first-last/total" rows, 1-based, with a marker when more are below.
fn position_label(state: &RenderState) -> String {
    let first = state.first_line + 1;
    let last = state.first_line + state.transcript.len();
    let more = if state.has_more_below() { " ↓" } else { "" };
    format!(" {}-{}/{}{} ", first, last, state.transcript_len, more)
}

fn render_keymap(frame: &mut Frame, state: &RenderState, area: Rect) {
    let groups = keybindings_for_context(KeymapContext::from_render_state(state));

    let key_style = Style::default().fg(COLOR_TEXT_DIMMED);
    let desc_style = Style::default().fg(COLOR_TEXT_MUTED);

    let mut spans: Vec<Span> = Vec::new();
    for group in &groups {
        if !spans.is_empty() {
            spans.push(Span::styled(" │ ", desc_style));
        }
        for (idx, binding) in group.0.iter().enumerate() {
            if idx > 0 {
                spans.push(Span::styled(" • ", desc_style));
            }
            spans.push(Span::styled(binding.0, key_style));
            spans.push(Span::styled(format!(" {}", binding.1), desc_style));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Examples dropdown, anchored under the input line on the right.
fn render_menu(frame: &mut Frame, menu: &MenuView, area: Rect) {
    let widest = menu.items.iter().map(|i| i.chars().count()).max().unwrap_or(0);
    let width = ((widest + 4) as u16).min(area.width);
    let height = ((menu.items.len() + 2) as u16).min(area.height.saturating_sub(1));
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width),
        y: area.y + 1,
        width,
        height,
    };

    let lines: Vec<Line> = menu
        .items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let style = if idx == menu.selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Line::from(Span::styled(
                truncate(item, width.saturating_sub(2) as usize),
                style,
            ))
        })
        .collect();

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(Block::bordered().title(" examples ")),
        popup,
    );
}

fn render_alert(frame: &mut Frame, alert: Alert, area: Rect) {
    let width = ALERT_WIDTH.min(area.width);
    let height = 6u16.min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let text = vec![
        Line::from(Span::styled(
            alert.message(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        Line::from(Span::styled(
            "Enter to dismiss",
            Style::default().fg(COLOR_TEXT_MUTED),
        )),
    ];

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(
                Block::bordered()
                    .title(" alert ")
                    .border_style(Style::default().fg(Color::Red)),
            ),
        popup,
    );
}

fn truncate(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 1).collect();
        format!("{}~", truncated)
    }
}
