//! Error types shared across the daemon and the client

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving timer settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine user configuration directory")]
    NoConfigDir,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid timer settings: {0}")]
    Invalid(String),
}

/// Errors that stop the daemon from starting or keep running
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("daemon already running{}", .pid.map(|p| format!(" with PID {}", p)).unwrap_or_default())]
    AlreadyRunning { pid: Option<i32> },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the best-effort snapshot file
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors seen by the command-line client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to start daemon: {0}")]
    Spawn(std::io::Error),

    #[error("failed to connect to daemon at {path} after {attempts} attempts")]
    Connect { path: PathBuf, attempts: u32 },

    #[error("timed out waiting for the daemon")]
    Timeout,

    #[error("daemon closed the connection without replying")]
    NoReply,

    #[error("daemon rejected command `{0}`")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
