//! Daemon lifecycle: singleton check, startup, serving and cleanup

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use crate::{
    config::{RuntimePaths, TimerSettings},
    error::DaemonError,
    ipc::serve,
    services::{DesktopNotifier, Notifier, StateFile},
    state::AppState,
    tasks::{ticker_task, TICK_PERIOD},
    utils::{install_signal_handlers, shutdown_signal, PidFile},
};

/// A configured, not yet running daemon
pub struct Daemon {
    paths: RuntimePaths,
    settings: TimerSettings,
    notifier: Box<dyn Notifier>,
    tick_period: Duration,
}

impl Daemon {
    pub fn new(paths: RuntimePaths, settings: TimerSettings) -> Self {
        Self {
            paths,
            settings,
            notifier: Box::new(DesktopNotifier),
            tick_period: TICK_PERIOD,
        }
    }

    /// Replace the desktop notifier
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Run until `quit` or SIGINT/SIGTERM, then remove every runtime file
    ///
    /// Fails with [`DaemonError::AlreadyRunning`] without touching the other
    /// instance's files when a live daemon already owns the marker or socket.
    pub async fn run(self) -> Result<(), DaemonError> {
        let signals = install_signal_handlers()?;
        let signals_handle = signals.handle();

        let pid_file = PidFile::acquire(&self.paths.pid_file)?;
        let listener = bind_socket(&self.paths.socket).await?;
        let socket_file = SocketFile(self.paths.socket.clone());
        info!(socket = %self.paths.socket.display(), "Daemon listening");

        let state = Arc::new(AppState::new(
            self.settings,
            StateFile::new(&self.paths.state_file),
            self.notifier,
        ));
        state.persist_current().await;

        let ticker = tokio::spawn(ticker_task(Arc::clone(&state), self.tick_period));
        let signal_state = Arc::clone(&state);
        let signal_task = tokio::spawn(async move {
            shutdown_signal(signals).await;
            signal_state.shutdown().request();
        });

        serve(listener, Arc::clone(&state)).await;

        // serve only returns once shutdown was requested
        info!("Shutting down");
        state.shutdown().request();
        signals_handle.close();
        signal_task.abort();
        if let Err(e) = ticker.await {
            warn!("Ticker task failed: {}", e);
        }
        state.close().await;
        drop(socket_file);
        drop(pid_file);

        info!("Daemon stopped after {}", state.uptime());
        Ok(())
    }
}

/// Bind the rendezvous socket, clearing a stale one left by a dead daemon
async fn bind_socket(path: &Path) -> Result<UnixListener, DaemonError> {
    if path.exists() {
        if UnixStream::connect(path).await.is_ok() {
            return Err(DaemonError::AlreadyRunning { pid: None });
        }
        warn!("Removing stale socket {}", path.display());
        std::fs::remove_file(path)?;
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(UnixListener::bind(path)?)
}

/// Removes the bound socket path when dropped
struct SocketFile(PathBuf);

impl Drop for SocketFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => debug!("Removed socket {}", self.0.display()),
            Err(e) => warn!("Failed to remove socket {}: {}", self.0.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::app_state::tests::RecordingNotifier;

    #[tokio::test]
    async fn live_socket_blocks_binding() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("d.sock");
        let _other = UnixListener::bind(&socket).unwrap();

        assert!(matches!(
            bind_socket(&socket).await,
            Err(DaemonError::AlreadyRunning { pid: None })
        ));
    }

    #[tokio::test]
    async fn stale_socket_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("d.sock");
        drop(std::os::unix::net::UnixListener::bind(&socket).unwrap());
        assert!(socket.exists());

        assert!(bind_socket(&socket).await.is_ok());
    }

    #[tokio::test]
    async fn conflict_leaves_marker_of_running_instance() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::in_dir(dir.path());
        let _held = PidFile::acquire(&paths.pid_file).unwrap();

        let result = Daemon::new(paths.clone(), TimerSettings::default())
            .with_notifier(Box::new(RecordingNotifier::default()))
            .run()
            .await;

        assert!(matches!(result, Err(DaemonError::AlreadyRunning { .. })));
        assert!(paths.pid_file.exists());
        assert!(!paths.socket.exists());
    }
}
