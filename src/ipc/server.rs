//! IPC server over a Unix domain socket
//!
//! Each accepted connection is handled on its own task. One-shot commands
//! get a single reply line; `listen` registers a queue with the subscriber
//! registry and copies it onto the socket until the peer goes away or the
//! daemon shuts down.

use std::{io, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{
        unix::{OwnedReadHalf, OwnedWriteHalf},
        UnixListener, UnixStream,
    },
    task::JoinSet,
    time::timeout,
};
use tracing::{debug, error, info, warn};

use super::protocol::{
    Request, UnknownRequest, IO_TIMEOUT, MAX_REQUEST_LEN, REPLY_OK, REPLY_UNKNOWN,
};
use crate::state::{AppState, Subscription};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections until shutdown is requested
///
/// Returns only after every connection task has finished, so nothing
/// mutates the timer once the daemon starts cleaning up.
pub async fn serve(listener: UnixListener, state: Arc<AppState>) {
    let mut shutdown = state.shutdown().listener();
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let state = Arc::clone(&state);
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, state).await {
                            debug!("Connection closed with error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    error!("Connection task failed: {}", e);
                }
            }
            _ = shutdown.requested() => {
                info!("IPC server shutting down");
                break;
            }
        }
    }

    if !connections.is_empty() {
        debug!(open = connections.len(), "Waiting for connections to finish");
    }
    while let Some(finished) = connections.join_next().await {
        if let Err(e) = finished {
            error!("Connection task failed: {}", e);
        }
    }
}

/// Serve a single client connection
pub async fn handle_connection(stream: UnixStream, state: Arc<AppState>) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut shutdown = state.shutdown().listener();

    let mut raw = Vec::new();
    let mut limited = (&mut reader).take(MAX_REQUEST_LEN);
    tokio::select! {
        read = timeout(IO_TIMEOUT, limited.read_until(b'\n', &mut raw)) => match read {
            Ok(read) => {
                read?;
            }
            Err(_) => {
                debug!("Client sent no command in time");
                return Ok(());
            }
        },
        _ = shutdown.requested() => {
            debug!("Shutting down before the client sent a command");
            return Ok(());
        }
    }

    let text = String::from_utf8_lossy(&raw);
    let request = match text.parse::<Request>() {
        Ok(request) => request,
        Err(UnknownRequest(command)) => {
            warn!(%command, "Unknown command");
            return reply(&mut write_half, REPLY_UNKNOWN).await;
        }
    };
    debug!(%request, "Request received");

    match request {
        Request::Toggle => {
            state.toggle().await;
            reply(&mut write_half, REPLY_OK).await
        }
        Request::Stop => {
            state.stop().await;
            reply(&mut write_half, REPLY_OK).await
        }
        Request::Skip => {
            state.skip().await;
            reply(&mut write_half, REPLY_OK).await
        }
        Request::State => {
            let line = state.snapshot().await.to_line().map_err(io::Error::other)?;
            reply(&mut write_half, &line).await
        }
        Request::Quit => {
            let result = reply(&mut write_half, REPLY_OK).await;
            info!("Quit requested by client");
            state.shutdown().request();
            result
        }
        Request::Listen => stream_updates(reader, write_half, state).await,
    }
}

/// Write one reply line and close our side
async fn reply(writer: &mut OwnedWriteHalf, line: &str) -> io::Result<()> {
    let write = async {
        writer.write_all(line.as_bytes()).await?;
        writer.shutdown().await?;
        Ok::<_, io::Error>(())
    };
    timeout(IO_TIMEOUT, write)
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "reply timed out"))?
}

/// Copy queued snapshots to a `listen` client
///
/// Writes carry no timeout: a slow reader only backs up its own queue.
async fn stream_updates(
    mut reader: BufReader<OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    state: Arc<AppState>,
) -> io::Result<()> {
    let Some(Subscription { id, mut updates }) = state.subscribe().await else {
        return Ok(());
    };

    // Input after `listen` is ignored; reading only detects the hang-up
    let mut shutdown = state.shutdown().listener();
    let mut discard = [0u8; 256];
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(line) = update else {
                    debug!(subscriber = id, "Subscriber queue closed");
                    break;
                };
                tokio::select! {
                    written = writer.write_all(line.as_bytes()) => {
                        if let Err(e) = written {
                            debug!(subscriber = id, "Send failed: {}", e);
                            break;
                        }
                    }
                    _ = shutdown.requested() => break,
                }
            }
            read = reader.read(&mut discard) => match read {
                Ok(0) | Err(_) => {
                    debug!(subscriber = id, "Subscriber disconnected");
                    break;
                }
                Ok(_) => {}
            },
            _ = shutdown.requested() => break,
        }
    }
    Ok(())
}
