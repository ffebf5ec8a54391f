//! Client side of the daemon protocol
//!
//! Connects to the daemon's socket, starting a detached daemon first when
//! the socket does not exist yet, so callers never need a separate start
//! step.

use std::{
    path::PathBuf,
    process::Stdio,
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
    process::Command,
    time::{sleep, timeout},
};
use tracing::{debug, info};

use super::protocol::{Request, IO_TIMEOUT, REPLY_OK, REPLY_UNKNOWN};
use crate::error::ClientError;

/// Connection attempts made after launching a daemon
pub const CONNECT_ATTEMPTS: u32 = 50;
/// Pause between connection attempts
pub const CONNECT_INTERVAL: Duration = Duration::from_millis(100);

/// How to start a daemon when none is listening
#[derive(Debug, Clone)]
pub struct DaemonLauncher {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl DaemonLauncher {
    /// Re-execute the current binary with `args`
    pub fn current_exe(args: Vec<String>) -> Result<Self, ClientError> {
        let program = std::env::current_exe().map_err(ClientError::Spawn)?;
        Ok(Self { program, args })
    }

    /// Start the daemon detached from our terminal and process group
    pub fn spawn(&self) -> Result<(), ClientError> {
        info!("Daemon not running, starting it in the background");
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(ClientError::Spawn)?;
        debug!(pid = ?child.id(), "Daemon process spawned");
        Ok(())
    }
}

/// Sends commands to the daemon
#[derive(Debug, Clone)]
pub struct Client {
    socket: PathBuf,
    launcher: Option<DaemonLauncher>,
}

impl Client {
    /// A client that only talks to an already running daemon
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
            launcher: None,
        }
    }

    /// Start a daemon with `launcher` whenever the socket is missing
    pub fn with_launcher(mut self, launcher: DaemonLauncher) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Connect, launching the daemon first if nothing answers on the socket
    ///
    /// A leftover socket file with no daemon behind it counts as missing; the
    /// new daemon replaces it.
    pub async fn connect(&self) -> Result<UnixStream, ClientError> {
        if let Ok(stream) = UnixStream::connect(&self.socket).await {
            return Ok(stream);
        }

        if let Some(launcher) = &self.launcher {
            launcher.spawn()?;
        }
        self.retry_connect(CONNECT_ATTEMPTS, CONNECT_INTERVAL).await
    }

    async fn retry_connect(
        &self,
        attempts: u32,
        interval: Duration,
    ) -> Result<UnixStream, ClientError> {
        for attempt in 1..=attempts {
            match UnixStream::connect(&self.socket).await {
                Ok(stream) => {
                    debug!(attempt, "Connected to daemon");
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(attempt, "Connect failed: {}", e);
                    sleep(interval).await;
                }
            }
        }
        Err(ClientError::Connect {
            path: self.socket.clone(),
            attempts,
        })
    }

    /// Send a one-shot request and return the reply line without its newline
    ///
    /// An `UNKNOWN` reply becomes [`ClientError::Rejected`].
    pub async fn request(&self, request: Request) -> Result<String, ClientError> {
        let stream = self.connect().await?;
        let exchange = async {
            let mut stream = BufReader::new(stream);
            stream.get_mut().write_all(request.to_line().as_bytes()).await?;

            let mut reply = String::new();
            stream.read_line(&mut reply).await?;
            Ok::<_, ClientError>(reply)
        };
        let reply = timeout(IO_TIMEOUT, exchange)
            .await
            .map_err(|_| ClientError::Timeout)??;

        if reply.is_empty() {
            return Err(ClientError::NoReply);
        }
        if reply == REPLY_UNKNOWN {
            return Err(ClientError::Rejected(request.to_string()));
        }
        Ok(reply.trim_end_matches('\n').to_string())
    }

    /// Send a mutation and expect `OK`
    pub async fn command(&self, request: Request) -> Result<(), ClientError> {
        let reply = self.request(request).await?;
        if reply == REPLY_OK.trim_end() {
            Ok(())
        } else {
            Err(ClientError::Rejected(request.to_string()))
        }
    }

    /// Subscribe and hand every received line to `on_line` until the daemon
    /// closes the stream
    pub async fn listen<F>(&self, mut on_line: F) -> Result<(), ClientError>
    where
        F: FnMut(&str) -> std::io::Result<()>,
    {
        let mut stream = self.connect().await?;
        stream.write_all(Request::Listen.to_line().as_bytes()).await?;

        let mut lines = BufReader::new(stream).lines();
        while let Some(line) = lines.next_line().await? {
            on_line(&line)?;
        }
        Ok(())
    }
}
