//! Signal handling and cooperative shutdown

use futures::stream::StreamExt;
use signal_hook_tokio::Signals;
use tokio::sync::watch;
use tracing::info;

/// Register SIGTERM and SIGINT handlers
///
/// Call this before the daemon claims any runtime files so that a signal
/// arriving during startup still goes through the cleanup path.
pub fn install_signal_handlers() -> std::io::Result<Signals> {
    Signals::new([signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT])
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
pub async fn shutdown_signal(mut signals: Signals) {
    if let Some(signal) = signals.next().await {
        info!("Received signal: {}", signal);
    }
}

/// Sending side of the daemon-wide shutdown flag
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Ask every task to wind down; idempotent
    pub fn request(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Observes the shutdown flag from a task
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolve once shutdown has been requested
    pub async fn requested(&mut self) {
        // A dropped sender also means the daemon is going away
        let _ = self.rx.wait_for(|requested| *requested).await;
    }
}
