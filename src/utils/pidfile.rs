//! Singleton PID marker

use std::{
    fs::OpenOptions,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use nix::{errno::Errno, sys::signal::kill, unistd::Pid};
use tracing::{info, warn};

use crate::error::DaemonError;

/// The claimed PID marker; removed again when dropped
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Claim the marker for this process
    ///
    /// Fails with [`DaemonError::AlreadyRunning`] when the marker names a live
    /// process. A stale or unreadable marker is removed first. The file is
    /// created with `O_CREAT | O_EXCL`, so of two racing launches only one wins.
    pub fn acquire(path: &Path) -> Result<Self, DaemonError> {
        if path.exists() {
            match read_pid(path) {
                Some(pid) if process_alive(pid) => {
                    return Err(DaemonError::AlreadyRunning { pid: Some(pid) });
                }
                Some(pid) => warn!("Removing stale PID file (process {} no longer running)", pid),
                None => warn!("Removing invalid PID file {}", path.display()),
            }
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound {
                    return Err(e.into());
                }
            }
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    DaemonError::AlreadyRunning {
                        pid: read_pid(path),
                    }
                } else {
                    DaemonError::Io(e)
                }
            })?;
        write!(file, "{}", std::process::id())?;

        info!(path = %path.display(), pid = std::process::id(), "PID file written");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        // Only remove the marker if it still names us
        if read_pid(&self.path) == i32::try_from(std::process::id()).ok() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Failed to remove PID file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Parse the decimal PID stored in `path`
pub fn read_pid(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Whether a process with this PID exists
pub fn process_alive(pid: i32) -> bool {
    // kill(0) and negative PIDs address process groups, never a single daemon
    if pid <= 0 {
        return false;
    }
    // Signal 0 only checks for existence; EPERM means it exists under another user
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}
