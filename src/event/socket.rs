//! Unix-socket IPC server
//!
//! Hook adapter processes connect, write newline-delimited JSON frames, and
//! close. Frames are applied to the registry in receive order per
//! connection; a malformed frame is skipped without dropping the connection,
//! and a failed connection never takes the server down.

use crate::event::WireFrame;
use crate::registry::Registry;
use color_eyre::Result;
use std::os::unix::io::{FromRawFd, IntoRawFd};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Semaphore;

/// Maximum concurrent connections to prevent resource exhaustion
const MAX_CONNECTIONS: usize = 100;

/// Socket receive buffer size (4KB is plenty for ~500 byte JSON frames)
const SOCKET_RECV_BUF: usize = 4096;

/// Accept hook-adapter connections until the task is aborted
pub async fn listen(registry: Registry, socket_path: &Path) -> Result<()> {
    // Remove a socket file left behind by an unclean shutdown
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }

    // Create socket with socket2 for buffer tuning
    let socket = socket2::Socket::new(socket2::Domain::UNIX, socket2::Type::STREAM, None)?;

    // OS may clamp to its minimum, which is fine
    if let Err(e) = socket.set_recv_buffer_size(SOCKET_RECV_BUF) {
        tracing::debug!("Could not set recv buffer size: {}", e);
    }

    socket.bind(&socket2::SockAddr::unix(socket_path)?)?;
    socket.listen(128)?;
    socket.set_nonblocking(true)?;

    let std_listener: std::os::unix::net::UnixListener =
        unsafe { std::os::unix::net::UnixListener::from_raw_fd(socket.into_raw_fd()) };
    let listener = UnixListener::from_std(std_listener)?;

    tracing::info!("Listening on {:?}", socket_path);

    let semaphore = Arc::new(Semaphore::new(MAX_CONNECTIONS));

    // Backoff state for accept errors
    let mut backoff_ms: u64 = 0;
    const MAX_BACKOFF_MS: u64 = 5000;

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                backoff_ms = 0;

                let permit = match semaphore.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::warn!(
                            "Connection limit reached ({} max), dropping connection",
                            MAX_CONNECTIONS
                        );
                        continue;
                    }
                };

                let registry = registry.clone();
                tokio::spawn(async move {
                    // Permit is held until this task completes
                    let _permit = permit;
                    handle_connection(stream, &registry).await;
                });
            }
            Err(e) => {
                tracing::error!("Accept error: {}", e);

                // Exponential backoff to prevent CPU spin on persistent errors
                if backoff_ms == 0 {
                    backoff_ms = 100;
                } else {
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }

                tracing::debug!("Backing off for {}ms", backoff_ms);
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms)).await;
            }
        }
    }
}

/// Drain one connection's frames. Senders typically write a few lines and
/// close; decoding errors skip the frame and keep reading.
async fn handle_connection(stream: UnixStream, registry: &Registry) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<WireFrame>(line) {
                    Ok(WireFrame::Event { event }) => {
                        tracing::debug!(session_id = %event.session_id, "Received event frame");
                        registry.apply(event);
                    }
                    Ok(WireFrame::Ping) => {
                        if let Ok(pong) = WireFrame::Pong.to_line() {
                            if write_half.write_all(pong.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(WireFrame::Pong) => {} // not ours to answer
                    Err(e) => {
                        tracing::debug!("Undecodable frame, skipping: {} - {}", e, line);
                    }
                }
            }
            Ok(None) => break, // stream closed
            Err(e) => {
                tracing::warn!("Read error, dropping connection: {}", e);
                break;
            }
        }
    }
}
