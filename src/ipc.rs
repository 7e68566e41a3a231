//! IPC between CLI commands and the daemon
//!
//! Unix socket at `$XDG_RUNTIME_DIR/idlesw.sock` (or `/tmp/idlesw-$UID.sock`),
//! one request and one response per connection, each framed as a 4-byte
//! big-endian length followed by JSON.

use color_eyre::eyre::{self, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, warn};

use crate::machine::Phase;

// ============================================================================
// Message Types
// ============================================================================

/// Requests sent from CLI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Query the switcher's current state
    Status,
    /// Stop monitoring and exit
    Shutdown,
}

/// Responses sent from daemon to CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Status(DaemonStatus),
    Ok { message: String },
    Error { message: String },
}

/// Snapshot of the running switcher, refreshed on every tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub version: String,
    pub uptime_secs: u64,
    /// Display name of the resolved target device
    pub target: String,
    pub target_id: String,
    pub idle_source: String,
    pub phase: Phase,
    pub idle_ms: u64,
    pub percent: u8,
    pub threshold_ms: u64,
    pub switches: u64,
}

// ============================================================================
// Socket Path Management
// ============================================================================

/// Get the IPC socket path
///
/// Prefers `$XDG_RUNTIME_DIR/idlesw.sock`; falls back to a per-user path in
/// `/tmp` so two users on one machine never share a socket.
#[must_use]
pub fn get_socket_path() -> PathBuf {
    match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(runtime_dir) if !runtime_dir.is_empty() => {
            PathBuf::from(runtime_dir).join("idlesw.sock")
        }
        _ => PathBuf::from(format!("/tmp/idlesw-{}.sock", users::get_current_uid())),
    }
}

/// Remove the socket file if no daemon answers on it
///
/// # Errors
/// Returns an error if the stale socket file cannot be removed.
pub async fn cleanup_stale_socket(socket_path: &Path) -> Result<()> {
    if !socket_path.exists() {
        return Ok(());
    }

    match tokio::time::timeout(Duration::from_millis(100), UnixStream::connect(socket_path)).await
    {
        Ok(Ok(_)) => eyre::bail!(
            "Another idlesw daemon is already running (socket: {})",
            socket_path.display()
        ),
        Ok(Err(_)) | Err(_) => {
            debug!("Removing stale socket: {:?}", socket_path);
            std::fs::remove_file(socket_path).with_context(|| {
                format!("Failed to remove stale socket: {}", socket_path.display())
            })?;
            Ok(())
        }
    }
}

/// Check whether a daemon is listening on the socket
pub async fn is_daemon_running() -> bool {
    let socket_path = get_socket_path();
    matches!(
        tokio::time::timeout(Duration::from_millis(200), UnixStream::connect(&socket_path)).await,
        Ok(Ok(_))
    )
}

// ============================================================================
// Protocol Helpers
// ============================================================================

const MAX_MESSAGE_SIZE: usize = 64 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Read a length-prefixed JSON message from a stream
async fn read_message<T, S>(stream: &mut S) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    S: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    tokio::time::timeout(READ_TIMEOUT, stream.read_exact(&mut len_buf))
        .await
        .context("Timeout reading message length")?
        .context("Failed to read message length")?;

    let msg_len = u32::from_be_bytes(len_buf) as usize;
    if msg_len > MAX_MESSAGE_SIZE {
        eyre::bail!("Message too large: {msg_len} bytes (max: {MAX_MESSAGE_SIZE})");
    }

    let mut msg_buf = vec![0u8; msg_len];
    tokio::time::timeout(READ_TIMEOUT, stream.read_exact(&mut msg_buf))
        .await
        .context("Timeout reading message payload")?
        .context("Failed to read message payload")?;

    serde_json::from_slice(&msg_buf).context("Failed to deserialize message")
}

/// Write a length-prefixed JSON message to a stream
async fn write_message<T, S>(stream: &mut S, message: &T) -> Result<()>
where
    T: Serialize,
    S: AsyncWrite + Unpin,
{
    let json = serde_json::to_vec(message).context("Failed to serialize message")?;
    if json.len() > MAX_MESSAGE_SIZE {
        eyre::bail!(
            "Message too large: {} bytes (max: {MAX_MESSAGE_SIZE})",
            json.len()
        );
    }

    let len = (json.len() as u32).to_be_bytes();
    stream
        .write_all(&len)
        .await
        .context("Failed to write message length")?;
    stream
        .write_all(&json)
        .await
        .context("Failed to write message payload")?;
    stream.flush().await.context("Failed to flush stream")?;

    Ok(())
}

// ============================================================================
// IPC Client (for CLI commands)
// ============================================================================

/// Send a request to the daemon and wait for the response
///
/// # Errors
/// Returns an error if the daemon is not reachable or the exchange fails.
pub async fn send_request(request: Request) -> Result<Response> {
    let socket_path = get_socket_path();

    let mut stream = tokio::time::timeout(
        Duration::from_secs(2),
        UnixStream::connect(&socket_path),
    )
    .await
    .context("Timeout connecting to daemon")?
    .with_context(|| {
        format!(
            "Failed to connect to daemon. Is it running?\nSocket: {}",
            socket_path.display()
        )
    })?;

    debug!("Connected to daemon at {:?}", socket_path);

    write_message(&mut stream, &request).await?;
    read_response(&mut stream).await
}

/// Read the daemon's reply to a request
///
/// # Errors
/// Returns an error on timeout, oversized frames, or malformed JSON.
pub async fn read_response<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Response> {
    read_message(stream).await
}

// ============================================================================
// IPC Server (for daemon)
// ============================================================================

/// Listening socket owned by the daemon; the socket file is removed on drop
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl IpcServer {
    /// Bind the daemon socket, replacing a stale one
    ///
    /// # Errors
    /// Returns an error if another daemon owns the socket or binding fails.
    pub async fn bind() -> Result<Self> {
        Self::bind_at(get_socket_path()).await
    }

    /// Bind at an explicit path
    ///
    /// # Errors
    /// Returns an error if another daemon owns the socket or binding fails.
    pub async fn bind_at(socket_path: PathBuf) -> Result<Self> {
        cleanup_stale_socket(&socket_path).await?;

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind IPC socket: {}", socket_path.display()))?;

        debug!("IPC server listening on {:?}", socket_path);

        Ok(Self {
            listener,
            socket_path,
        })
    }

    /// Accept the next incoming connection; `None` on a (non-fatal) accept error
    pub async fn accept(&self) -> Option<UnixStream> {
        match self.listener.accept().await {
            Ok((stream, _addr)) => Some(stream),
            Err(e) => {
                error!("Failed to accept IPC connection: {}", e);
                None
            }
        }
    }

    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            warn!("Failed to remove IPC socket on shutdown: {}", e);
        } else {
            debug!("Removed IPC socket: {:?}", self.socket_path);
        }
    }
}

/// Read a request from a client connection
///
/// # Errors
/// Returns an error on timeout, oversized frames, or malformed JSON.
pub async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Request> {
    read_message(stream).await
}

/// Write a response to a client connection
///
/// # Errors
/// Returns an error if the client has gone away.
pub async fn write_response<S: AsyncWrite + Unpin>(
    stream: &mut S,
    response: &Response,
) -> Result<()> {
    write_message(stream, response).await
}
