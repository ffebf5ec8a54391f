//! Pomodoro - a singleton timer daemon streaming live state over a Unix socket
//!
//! One daemon owns the timer, ticks it once per second and serves any number
//! of clients: one-shot commands (`toggle`, `stop`, `skip`, `state`, `quit`)
//! and `listen` subscriptions that receive a JSON snapshot on every change.
//! The client entry point starts the daemon on demand.

pub mod config;
pub mod daemon;
pub mod error;
pub mod ipc;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::{CliCommand, Config, RuntimePaths, TimerSettings};
pub use daemon::Daemon;
pub use error::{ClientError, ConfigError, DaemonError};
pub use ipc::{Client, DaemonLauncher, Request};
pub use state::{AppState, Snapshot, TimerState};
