use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event::{self, Event};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::engine::{ProcessSpawner, Spawner, WorkerEvent};
use crate::probe::NativeHost;
use crate::render::RenderState;
use crate::tea::{update, Command, Message, Model};
use crate::{ui, ulog, ulog_debug, Result};

/// Worker events handled per loop turn, so keys never wait behind a flood of
/// engine output (`go infinite`).
const MAX_WORKER_EVENTS: usize = 256;

pub struct LogicThread;

impl LogicThread {
    pub fn run(
        config: Config,
        state_tx: Sender<RenderState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        Runtime::new()?.block_on(Self::run_async(config, state_tx, shutdown))
    }

    async fn run_async(
        config: Config,
        state_tx: Sender<RenderState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        let spawner = ProcessSpawner::from_command(&config.engine_command())?;
        let (width, height) = crossterm::terminal::size()?;
        let mut model = Model::new(&config, spawner.label(), ui::transcript_rows(height));
        model.set_viewport(ui::transcript_rows(height), ui::transcript_cols(width));
        ulog_debug!(
            "LogicThread::run_async engine={} rows={} cols={}",
            spawner.label(),
            model.viewport_rows,
            model.viewport_cols
        );

        let (worker_tx, mut worker_rx) = mpsc::unbounded_channel::<WorkerEvent>();
        model.mount(&NativeHost::new(), &spawner, worker_tx);
        send_state(&state_tx, &mut model);

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Keyboard input (priority)
            while event::poll(Duration::ZERO)? {
                let msg = match event::read()? {
                    Event::Key(key) => Message::Key(key),
                    Event::Resize(w, h) => Message::Resize(w, h),
                    _ => continue,
                };
                if handle_message(&mut model, msg) {
                    shutdown.store(true, Ordering::Relaxed);
                    model.session.unmount();
                    return Ok(());
                }
                send_state(&state_tx, &mut model);
            }

            for _ in 0..MAX_WORKER_EVENTS {
                let Ok(event) = worker_rx.try_recv() else { break };
                update(&mut model, Message::Worker(event));
            }
            send_state(&state_tx, &mut model);

            tokio::time::sleep(Duration::from_micros(500)).await;
        }

        model.session.unmount();
        Ok(())
    }
}

/// Apply one message and run what it asks for. Returns true when the loop
/// should exit.
fn handle_message(model: &mut Model, msg: Message) -> bool {
    let cmds = update(model, msg);
    run_commands(model, cmds)
}

/// Returns true when the loop should exit.
fn run_commands(model: &mut Model, cmds: Vec<Command>) -> bool {
    for cmd in cmds {
        match cmd {
            Command::Quit => {
                ulog!(
                    "Quit requested; transcript had {} lines",
                    model.session.transcript().len()
                );
                return true;
            }
        }
    }
    false
}

/// Push a snapshot if anything changed. A full channel leaves the model dirty
/// so the next turn retries with fresher state.
fn send_state(state_tx: &Sender<RenderState>, model: &mut Model) {
    if model.dirty && state_tx.try_send(model.snapshot()).is_ok() {
        model.dirty = false;
    }
}
