//! Per-connection echo handler.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Echo every received chunk back before reading the next one
//! - Close the stream and release the admission slot on every exit path
//!
//! # Design Decisions
//! - Failures end the connection and are logged here; they never reach the
//!   accept loop or other connections
//! - No read timeout unless `idle_timeout` is configured

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;

use crate::net::admission::SlotPermit;
use crate::observability::metrics;

/// Relaxed ordering is enough; IDs only need to be unique.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Settings shared by every handler.
#[derive(Debug, Clone, Copy)]
pub struct HandlerSettings {
    /// Maximum bytes read per chunk.
    pub read_buffer_size: usize,
    /// Close the connection after this long without peer data.
    pub idle_timeout: Option<Duration>,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            read_buffer_size: 1024,
            idle_timeout: None,
        }
    }
}

/// Why a connection ended.
#[derive(Debug)]
pub enum ConnectionOutcome {
    /// Peer closed its side (end of stream).
    PeerClosed,
    /// Reading from the peer failed.
    ReadFailed(std::io::Error),
    /// Writing the echo back failed.
    WriteFailed(std::io::Error),
    /// No data arrived within the configured idle timeout.
    IdleTimeout,
}

impl ConnectionOutcome {
    /// Whether the connection ended without an error.
    pub fn is_clean(&self) -> bool {
        matches!(self, ConnectionOutcome::PeerClosed)
    }
}

/// Run the echo loop for one admitted connection.
///
/// The stream is closed before the permit is released, and both happen
/// before this future completes.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    permit: SlotPermit,
    settings: HandlerSettings,
) -> ConnectionOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = ConnectionId::new();
    let span = tracing::debug_span!("connection", connection_id = %id, peer = %peer);

    async move {
        tracing::debug!("Connection opened");

        let mut stream = stream;
        let (outcome, echoed) = echo(&mut stream, settings).await;

        match &outcome {
            ConnectionOutcome::PeerClosed => {
                tracing::debug!(bytes_echoed = echoed, "Peer closed connection");
            }
            ConnectionOutcome::ReadFailed(e) => {
                tracing::warn!(error = %e, bytes_echoed = echoed, "Read error");
            }
            ConnectionOutcome::WriteFailed(e) => {
                tracing::warn!(error = %e, bytes_echoed = echoed, "Write error");
            }
            ConnectionOutcome::IdleTimeout => {
                tracing::info!(bytes_echoed = echoed, "Closing idle connection");
            }
        }

        if let Err(e) = stream.shutdown().await {
            tracing::debug!(error = %e, "Error closing connection");
        }
        drop(stream);
        permit.release();

        tracing::debug!("Connection closed");
        outcome
    }
    .instrument(span)
    .await
}

/// Echo loop. Returns the outcome and the number of bytes echoed.
async fn echo<S>(stream: &mut S, settings: HandlerSettings) -> (ConnectionOutcome, u64)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; settings.read_buffer_size.max(1)];
    let mut echoed = 0u64;

    loop {
        let read = match settings.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.read(&mut buf)).await {
                Ok(read) => read,
                Err(_) => return (ConnectionOutcome::IdleTimeout, echoed),
            },
            None => stream.read(&mut buf).await,
        };

        let n = match read {
            Ok(0) => return (ConnectionOutcome::PeerClosed, echoed),
            Ok(n) => n,
            Err(e) => return (ConnectionOutcome::ReadFailed(e), echoed),
        };

        if let Err(e) = stream.write_all(&buf[..n]).await {
            return (ConnectionOutcome::WriteFailed(e), echoed);
        }
        echoed += n as u64;
        metrics::record_bytes_echoed(n);
    }
}
