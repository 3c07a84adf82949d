//! File logging for ucicon.
//!
//! The TUI owns stdout, so every diagnostic goes to `~/.ucicon/ucicon.log`
//! (truncated at startup). Levels, most to least severe:
//! - ERROR: the engine could not be spawned or written to
//! - WARN: capability probe steps that failed, alerts raised to the user
//! - INFO: startup, probe verdict, engine lifecycle
//! - DEBUG: controller transitions and commands executed by the logic thread
//! - TRACE: every engine line in both directions
//!
//! Debug mode is enabled with `--debug` or `UCICON_DEBUG=1`; `UCICON_DEBUG=trace`
//! adds engine traffic.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

const DEBUG_ENV: &str = "UCICON_DEBUG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Whether an env value switches debug logging on ("1" or "true", any case).
fn env_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Initialize logging. `debug` comes from the `--debug` flag; the env var can
/// also turn it on.
pub fn init(debug: bool) {
    let env = std::env::var(DEBUG_ENV).unwrap_or_default();

    let level = if env.eq_ignore_ascii_case("trace") {
        LogLevel::Trace
    } else if debug || env_flag(&env) {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    set_level(level);

    if let Ok(app_dir) = crate::config::Config::app_dir() {
        let _ = std::fs::create_dir_all(&app_dir);
        let path = app_dir.join("ucicon.log");
        let _ = std::fs::write(&path, "");
        LOG_PATH.set(path).ok();
    }
}

pub fn set_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

pub fn level() -> LogLevel {
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn enabled(level: LogLevel) -> bool {
    level <= self::level()
}

/// Append one line at `level` if it passes the current filter.
pub fn write(level: LogLevel, msg: &str) {
    if !enabled(level) {
        return;
    }
    let Some(path) = LOG_PATH.get() else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        let _ = writeln!(file, "[{}] [{}] {}", timestamp, level.as_str(), msg);
    }
}

#[macro_export]
macro_rules! ulog {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! ulog_error {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Error, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! ulog_warn {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! ulog_debug {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Debug, &format!($($arg)*))
    };
}

/// Engine traffic. Skips the `format!` entirely unless TRACE is on, since it
/// runs once per engine line.
#[macro_export]
macro_rules! ulog_trace {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Trace) {
            $crate::log::write($crate::log::LogLevel::Trace, &format!($($arg)*))
        }
    };
}
