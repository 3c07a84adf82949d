use std::io::{self, stdout, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, TryRecvError};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::io::BufReader;
use tokio::sync::mpsc;

use ucicon::app::LogicThread;
use ucicon::config::Config;
use ucicon::engine::{ProcessSpawner, Spawner, WorkerEvent};
use ucicon::probe::{probe_report, NativeHost};
use ucicon::render::{RenderState, FRAME_DURATION};
use ucicon::session::EngineSession;
use ucicon::{headless, ui, ulog, Error, Result};

/// ucicon - interactive console for UCI chess engines
#[derive(Parser, Debug)]
#[command(name = "ucicon")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    UCICON_DEBUG=1      Enable debug logging (alternative to --debug)\n    UCICON_DEBUG=trace  Also log every engine line"
)]
pub struct Cli {
    /// Engine command line (overrides the config file)
    #[arg(short = 'e', long)]
    pub engine: Option<String>,

    /// Enable debug logging (writes to ~/.ucicon/ucicon.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Start with auto-scroll off
    #[arg(long)]
    pub no_auto_scroll: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the capability probe and print the report as JSON
    Probe,

    /// Relay stdin lines to the engine and engine output to stdout
    Pipe {
        /// Quiet period after stdin closes before exiting
        #[arg(long, default_value_t = 500)]
        idle_ms: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    ucicon::log::init(cli.debug);

    let mut config = Config::load()?;
    if let Some(engine) = cli.engine.clone() {
        config.engine = Some(engine);
    }
    if cli.no_auto_scroll {
        config.auto_scroll = false;
    }

    match cli.command {
        Some(Command::Probe) => return run_probe(),
        Some(Command::Pipe { idle_ms }) => {
            return run_pipe(config, Duration::from_millis(idle_ms));
        }
        None => {}
    }

    ulog!("ucicon starting (engine={})", config.effective_engine());

    let shutdown = Arc::new(AtomicBool::new(false));
    let (state_tx, state_rx) = crossbeam_channel::bounded::<RenderState>(1);

    let shutdown_clone = shutdown.clone();
    let logic_handle = thread::spawn(move || LogicThread::run(config, state_tx, shutdown_clone));

    let mut terminal = setup_terminal()?;
    let result = render_loop(&mut terminal, state_rx, &shutdown);

    shutdown.store(true, Ordering::SeqCst);
    let logic_result = logic_handle
        .join()
        .map_err(|_| Error::TaskJoin("logic thread panicked".to_string()))?;
    restore_terminal(&mut terminal)?;
    result.and(logic_result)
}

fn render_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: Receiver<RenderState>,
    shutdown: &AtomicBool,
) -> Result<()> {
    let mut state = RenderState::default();
    let mut last_version: u64 = 0;
    let mut last_frame = Instant::now();
    let mut dirty = true;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match state_rx.try_recv() {
            Ok(s) => {
                dirty = dirty || s.version != last_version;
                state = s;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        if last_frame.elapsed() < FRAME_DURATION {
            thread::sleep(Duration::from_micros(500));
            continue;
        }
        last_frame = Instant::now();

        if dirty {
            terminal.draw(|f| ui::draw(f, &state))?;
            last_version = state.version;
            dirty = false;
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.hide_cursor()?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(disable_raw_mode()?)
}

fn run_probe() -> Result<()> {
    let report = probe_report(&NativeHost::new());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_pipe(config: Config, idle: Duration) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let spawner = ProcessSpawner::from_command(&config.engine_command())?;
        let mut session = EngineSession::new(config.liveness_command(), config.auto_scroll);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<WorkerEvent>();

        if let Some(alert) = session.mount(&NativeHost::new(), &spawner, events_tx) {
            eprintln!("{}", alert.message());
            return Err(Error::Capability(alert.message().to_string()));
        }
        if !session.has_worker() {
            return Err(Error::EngineNotFound(spawner.label()));
        }

        let input = BufReader::new(tokio::io::stdin());
        let mut output = tokio::io::stdout();
        let summary = headless::relay(&mut session, input, &mut output, &mut events_rx, idle).await;
        session.unmount();

        let summary = summary?;
        ulog!(
            "Pipe finished: sent={} received={} status={}",
            summary.sent,
            summary.received,
            summary.status
        );
        Ok(())
    })
}
