//! TCP listener and accept loop with admission control.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Consult the admission gate and refuse connections when it is full
//! - Spawn one echo handler per admitted connection and track its task
//! - Stop accepting once shutdown is requested and close the socket
//!
//! # States
//! ```text
//! Running ──(shutdown requested)──▶ Draining ──(socket closed)──▶ Stopped
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tokio::task::JoinSet;

use crate::lifecycle::ShutdownSignal;
use crate::net::admission::AdmissionGate;
use crate::net::connection::{handle_connection, HandlerSettings};
use crate::observability::metrics;

/// Pause after a transient accept error so a persistent one does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The address did not resolve to anything.
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A bound TCP listening socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to `address` (`host:port`).
    pub async fn bind(address: &str) -> Result<Self, ListenerError> {
        let addrs: Vec<SocketAddr> = lookup_host(address)
            .await
            .map_err(|source| ListenerError::Resolve {
                address: address.to_string(),
                source,
            })?
            .collect();

        if addrs.is_empty() {
            return Err(ListenerError::Resolve {
                address: address.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "no addresses found",
                ),
            });
        }

        let inner = TcpListener::bind(addrs.as_slice())
            .await
            .map_err(|source| ListenerError::Bind {
                address: address.to_string(),
                source,
            })?;

        let local_addr = inner.local_addr().map_err(|source| ListenerError::Bind {
            address: address.to_string(),
            source,
        })?;

        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self { inner, local_addr })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Source of accepted connections for the accept loop.
pub trait Accept: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = std::io::Result<(Self::Stream, SocketAddr)>> + Send;

    /// Address connections arrive on.
    fn local_addr(&self) -> SocketAddr;
}

impl Accept for Listener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> std::io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept().await
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Accept loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    /// Accepting connections.
    Running,
    /// Shutdown observed; closing the listening socket.
    Draining,
    /// Listening socket closed.
    Stopped,
}

/// Accepts connections and spawns handlers until shutdown is requested.
pub struct AcceptLoop<A = Listener> {
    listener: A,
    gate: Arc<AdmissionGate>,
    shutdown: ShutdownSignal,
    settings: HandlerSettings,
    in_flight: JoinSet<()>,
    state: LoopState,
}

impl<A: Accept> AcceptLoop<A> {
    pub fn new(
        listener: A,
        gate: Arc<AdmissionGate>,
        shutdown: ShutdownSignal,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            listener,
            gate,
            shutdown,
            settings,
            in_flight: JoinSet::new(),
            state: LoopState::Running,
        }
    }

    /// Run until shutdown is requested.
    ///
    /// The listening socket is closed before this returns. The returned set
    /// holds every handler task that may still be running.
    pub async fn run(mut self) -> JoinSet<()> {
        let address = self.listener.local_addr();
        tracing::info!(
            address = %address,
            max_connections = self.gate.max(),
            "Accepting connections"
        );

        while self.state == LoopState::Running {
            let accepted = tokio::select! {
                biased;
                _ = self.shutdown.requested() => {
                    self.state = LoopState::Draining;
                    continue;
                }
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => self.admit(stream, peer),
                Err(_) if self.shutdown.is_requested() => {
                    self.state = LoopState::Draining;
                }
                Err(e) => {
                    metrics::record_accept_error();
                    tracing::warn!(error = %e, "Error accepting connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }

            // Reap handlers that already finished.
            while self.in_flight.try_join_next().is_some() {}
        }

        drop(self.listener);
        self.state = LoopState::Stopped;

        tracing::info!(
            address = %address,
            in_flight = self.in_flight.len(),
            "Listener closed"
        );
        self.in_flight
    }

    fn admit(&mut self, stream: A::Stream, peer: SocketAddr) {
        let Some(permit) = self.gate.try_acquire() else {
            metrics::record_rejected();
            tracing::info!(
                peer_addr = %peer,
                max_connections = self.gate.max(),
                "Connection refused, limit reached"
            );
            drop(stream);
            return;
        };

        metrics::record_accepted();
        tracing::debug!(
            peer_addr = %peer,
            active = self.gate.active(),
            "Connection accepted"
        );

        let settings = self.settings;
        self.in_flight.spawn(async move {
            handle_connection(stream, peer, permit, settings).await;
        });
    }
}
