//! Configuration and CLI argument handling

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{error::ConfigError, ipc::Request};

/// Default rendezvous socket for the daemon
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/pomodoro.sock";
/// Default singleton marker holding the daemon's PID
pub const DEFAULT_PID_FILE: &str = "/tmp/pomodoro.pid";
/// Default location of the advisory snapshot file
pub const DEFAULT_STATE_FILE: &str = "/tmp/pomodoro-state.json";

const DEFAULT_WORK_DURATION: u32 = 1500;
const DEFAULT_SHORT_BREAK: u32 = 300;
const DEFAULT_LONG_BREAK: u32 = 900;
const DEFAULT_LONG_BREAK_INTERVAL: u32 = 4;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "pomodoro")]
#[command(about = "A singleton Pomodoro timer daemon and its client")]
#[command(version)]
pub struct Config {
    /// What to do; defaults to printing the current state
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Unix socket the daemon listens on
    #[arg(long, global = true, default_value = DEFAULT_SOCKET_PATH)]
    pub socket: PathBuf,

    /// PID marker used to enforce a single daemon
    #[arg(long, global = true, default_value = DEFAULT_PID_FILE)]
    pub pid_file: PathBuf,

    /// Snapshot file rewritten on every state change
    #[arg(long, global = true, default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// Work duration in minutes (overrides config file)
    #[arg(short, long, global = true)]
    pub work: Option<u32>,

    /// Short break duration in minutes (overrides config file)
    #[arg(short, long, global = true)]
    pub short: Option<u32>,

    /// Long break duration in minutes (overrides config file)
    #[arg(short, long, global = true)]
    pub long: Option<u32>,

    /// Completed work segments before a long break (overrides config file)
    #[arg(short, long, global = true)]
    pub interval: Option<u32>,

    /// Timer settings file (default: ~/.config/pomodoro/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Subcommands accepted by the `pomodoro` binary
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    /// Run the daemon in the foreground
    Daemon,
    /// Stream a snapshot line on every state change
    Listen,
    /// Start, pause or resume the current segment
    Toggle,
    /// Reset to an idle work segment and clear the session count
    Stop,
    /// Jump to the next segment without counting it
    Skip,
    /// Print the current snapshot
    State,
    /// Shut the daemon down
    Kill,
}

impl CliCommand {
    /// The wire request this subcommand sends, `None` for `daemon`
    pub fn request(self) -> Option<Request> {
        match self {
            CliCommand::Daemon => None,
            CliCommand::Listen => Some(Request::Listen),
            CliCommand::Toggle => Some(Request::Toggle),
            CliCommand::Stop => Some(Request::Stop),
            CliCommand::Skip => Some(Request::Skip),
            CliCommand::State => Some(Request::State),
            CliCommand::Kill => Some(Request::Quit),
        }
    }
}

/// Filesystem locations owned by a running daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub socket: PathBuf,
    pub pid_file: PathBuf,
    pub state_file: PathBuf,
}

impl RuntimePaths {
    /// Place all three runtime files inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            socket: dir.join("pomodoro.sock"),
            pid_file: dir.join("pomodoro.pid"),
            state_file: dir.join("pomodoro-state.json"),
        }
    }
}

/// Segment lengths in seconds and the long-break cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    pub work_duration: u32,
    pub short_break: u32,
    pub long_break: u32,
    pub long_break_interval: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_duration: DEFAULT_WORK_DURATION,
            short_break: DEFAULT_SHORT_BREAK,
            long_break: DEFAULT_LONG_BREAK,
            long_break_interval: DEFAULT_LONG_BREAK_INTERVAL,
        }
    }
}

impl TimerSettings {
    /// Read settings from a JSON file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the per-user settings file, writing a default one if it is absent
    pub fn load_or_create_default() -> Result<Self, ConfigError> {
        let path = default_config_path()?;
        if path.exists() {
            return Self::load(&path);
        }

        let settings = Self::default();
        if let Err(e) = write_default(&path, &settings) {
            warn!("Could not write default config to {}: {}", path.display(), e);
        } else {
            debug!("Wrote default config to {}", path.display());
        }
        Ok(settings)
    }

    /// Reject settings the state machine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.work_duration == 0 || self.short_break == 0 || self.long_break == 0 {
            return Err(ConfigError::Invalid(
                "segment durations must be at least one second".to_string(),
            ));
        }
        if self.long_break_interval == 0 {
            return Err(ConfigError::Invalid(
                "long break interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(dir.join("pomodoro").join("config.json"))
}

fn write_default(path: &Path, settings: &TimerSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// The subcommand to run, `state` when none was given
    pub fn command(&self) -> CliCommand {
        self.command.unwrap_or(CliCommand::State)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn runtime_paths(&self) -> RuntimePaths {
        RuntimePaths {
            socket: self.socket.clone(),
            pid_file: self.pid_file.clone(),
            state_file: self.state_file.clone(),
        }
    }

    /// Resolve timer settings: defaults, then the config file, then CLI overrides
    pub fn timer_settings(&self) -> Result<TimerSettings, ConfigError> {
        let mut settings = match &self.config {
            Some(path) => TimerSettings::load(path)?,
            None => TimerSettings::load_or_create_default()?,
        };

        // CLI durations are in minutes
        if let Some(work) = self.work {
            settings.work_duration = work.saturating_mul(60);
        }
        if let Some(short) = self.short {
            settings.short_break = short.saturating_mul(60);
        }
        if let Some(long) = self.long {
            settings.long_break = long.saturating_mul(60);
        }
        if let Some(interval) = self.interval {
            settings.long_break_interval = interval;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Arguments for re-executing this binary as a background daemon
    pub fn daemon_args(&self) -> Vec<String> {
        let mut args = vec![
            "--socket".to_string(),
            self.socket.display().to_string(),
            "--pid-file".to_string(),
            self.pid_file.display().to_string(),
            "--state-file".to_string(),
            self.state_file.display().to_string(),
        ];

        let overrides = [
            ("--work", self.work),
            ("--short", self.short),
            ("--long", self.long),
            ("--interval", self.interval),
        ];
        for (flag, value) in overrides {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value.to_string());
            }
        }

        if let Some(path) = &self.config {
            args.push("--config".to_string());
            args.push(path.display().to_string());
        }
        if self.verbose {
            args.push("--verbose".to_string());
        }

        args.push("daemon".to_string());
        args
    }
}
