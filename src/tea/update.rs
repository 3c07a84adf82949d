//! Update function for the TEA (The Elm Architecture) pattern.
//!
//! Applies one message to the model and returns the commands the logic thread
//! must run.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::engine::WorkerEvent;
use crate::ulog_debug;

use super::command::Command;
use super::message::Message;
use super::model::{ExamplesMenu, Model, ScrollPosition};

pub fn update(model: &mut Model, msg: Message) -> Vec<Command> {
    let mut cmds = Vec::new();

    match msg {
        Message::Key(key) => {
            if key.kind != KeyEventKind::Press {
                return cmds;
            }
            model.dirty = true;
            update_key(model, key, &mut cmds);
        }

        Message::Resize(width, height) => {
            model.set_viewport(
                crate::ui::transcript_rows(height),
                crate::ui::transcript_cols(width),
            );
        }

        Message::Worker(event) => {
            let grows = matches!(event, WorkerEvent::Line(_));
            if let Some(alert) = model.session.on_event(event) {
                // An open alert stays until dismissed; repeats do not stack.
                model.alert.get_or_insert(alert);
            }
            model.sync_rows();
            if grows && model.session.auto_scroll() {
                model.scroll = ScrollPosition::Bottom;
            }
            model.dirty = true;
        }
    }

    cmds
}

fn update_key(model: &mut Model, key: KeyEvent, cmds: &mut Vec<Command>) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        cmds.push(Command::Quit);
        return;
    }

    // Alerts block everything else until dismissed.
    if model.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            model.alert = None;
        }
        return;
    }

    if let Some(menu) = model.menu {
        update_menu(model, key, menu);
        return;
    }

    match key.code {
        KeyCode::F(2) => toggle_auto_scroll(model),
        KeyCode::PageUp => {
            let top = model.top().saturating_sub(model.viewport_rows.max(1));
            scroll_to(model, top);
        }
        KeyCode::PageDown => {
            let top = model.top() + model.viewport_rows.max(1);
            scroll_to(model, top);
        }
        KeyCode::Up => {
            let top = model.top().saturating_sub(1);
            scroll_to(model, top);
        }
        KeyCode::Down => {
            let top = model.top() + 1;
            scroll_to(model, top);
        }
        KeyCode::Home => scroll_to(model, 0),
        KeyCode::End => scroll_to(model, usize::MAX),
        KeyCode::Esc => cmds.push(Command::Quit),
        _ if model.session.input_enabled() => update_input(model, key),
        _ => {}
    }
}

fn update_input(model: &mut Model, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            ulog_debug!("submit {:?}", model.input);
            model.session.send(&mut model.input);
        }
        KeyCode::Tab => {
            if !model.examples.is_empty() {
                model.menu = Some(ExamplesMenu { selected: 0 });
            }
        }
        KeyCode::Backspace => {
            model.input.pop();
        }
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            model.input.push(c);
        }
        _ => {}
    }
}

fn update_menu(model: &mut Model, key: KeyEvent, menu: ExamplesMenu) {
    let count = model.examples.len();
    match key.code {
        KeyCode::Down if count > 0 => {
            model.menu = Some(ExamplesMenu {
                selected: (menu.selected + 1) % count,
            });
        }
        KeyCode::Up if count > 0 => {
            model.menu = Some(ExamplesMenu {
                selected: menu.selected.checked_sub(1).unwrap_or(count - 1),
            });
        }
        KeyCode::Enter => {
            if let Some(example) = model.examples.get(menu.selected) {
                model.input = example.clone();
            }
            model.menu = None;
        }
        KeyCode::Tab | KeyCode::Esc => {
            model.menu = None;
        }
        _ => {}
    }
}

/// Flip auto-scroll. Switching it off freezes the viewport where it is.
fn toggle_auto_scroll(model: &mut Model) {
    if !model.session.toggle_auto_scroll() {
        model.scroll = ScrollPosition::Line(model.top());
    }
}

/// Move the viewport. Reaching the end re-pins it only while auto-scroll is on.
fn scroll_to(model: &mut Model, top: usize) {
    let max_top = model.max_top();
    let top = top.min(max_top);
    model.scroll = if top == max_top && model.session.auto_scroll() {
        ScrollPosition::Bottom
    } else {
        ScrollPosition::Line(top)
    };
}
