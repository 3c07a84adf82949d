use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::{ulog_debug, Error, Result};

/// Command sent to a freshly spawned engine to confirm it is alive.
pub const DEFAULT_LIVENESS_COMMAND: &str = "isready";

const DEFAULT_ENGINE: &str = "stockfish";

/// Canned commands offered by the examples menu.
pub const DEFAULT_EXAMPLES: [&str; 9] = [
    "stop",
    "isready",
    "uci",
    "go depth 15",
    "eval",
    "d",
    "position startpos",
    "setoption name Threads value 4",
    "go infinite",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Engine command line, split on whitespace. Defaults to `stockfish`.
    pub engine: Option<String>,
    #[serde(default = "default_true")]
    pub auto_scroll: bool,
    pub liveness_command: Option<String>,
    pub examples: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: None,
            auto_scroll: true,
            liveness_command: None,
            examples: None,
        }
    }
}

impl Config {
    pub fn app_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".ucicon"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("ucicon.toml"))
    }

    pub fn effective_engine(&self) -> &str {
        self.engine
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(DEFAULT_ENGINE)
    }

    /// The engine command line as program + arguments.
    pub fn engine_command(&self) -> Vec<String> {
        self.effective_engine()
            .split_whitespace()
            .map(String::from)
            .collect()
    }

    pub fn liveness_command(&self) -> &str {
        self.liveness_command
            .as_deref()
            .unwrap_or(DEFAULT_LIVENESS_COMMAND)
    }

    pub fn examples(&self) -> Vec<String> {
        match &self.examples {
            Some(list) if !list.is_empty() => list.clone(),
            _ => DEFAULT_EXAMPLES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        ulog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            ulog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config = Self::parse(&fs::read_to_string(&path)?)?;
        ulog_debug!(
            "Config loaded: engine={:?}, auto_scroll={}, examples={}",
            config.engine,
            config.auto_scroll,
            config.examples.as_ref().map(|e| e.len()).unwrap_or(0)
        );
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}
