//! Server facade.
//!
//! Composes the listener, admission gate and shutdown coordinator behind
//! `start()` and `shutdown()`.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::lifecycle::shutdown::{drain, Phase, ShutdownCoordinator};
use crate::net::admission::AdmissionGate;
use crate::net::listener::{AcceptLoop, Listener};

/// TCP echo server with a hard connection cap and graceful shutdown.
///
/// Cloning is cheap; clones share the same server.
#[derive(Debug, Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: ServerConfig,
    gate: Arc<AdmissionGate>,
    coordinator: ShutdownCoordinator,
}

impl Server {
    /// Create a server. Nothing is bound until [`start`](Self::start).
    pub fn new(config: ServerConfig) -> Self {
        let gate = AdmissionGate::new(config.max_connections);
        Self {
            inner: Arc::new(Inner {
                config,
                gate,
                coordinator: ShutdownCoordinator::new(),
            }),
        }
    }

    /// Bind and serve until shutdown completes.
    ///
    /// Returns `Ok(())` only after the listener is closed and every
    /// connection handler has finished. A bind failure is returned at once.
    pub async fn start(&self) -> Result<(), ServerError> {
        let inner = &self.inner;
        inner.coordinator.begin_start()?;
        let _stopped = StopOnExit(&inner.coordinator);

        let listener = Listener::bind(&inner.config.server_address).await?;

        let address = listener.local_addr();
        inner.coordinator.mark_running(address);
        tracing::info!(
            address = %address,
            max_connections = inner.config.max_connections,
            "Echo server started"
        );

        let accept_loop = AcceptLoop::new(
            listener,
            Arc::clone(&inner.gate),
            inner.coordinator.signal(),
            inner.config.handler_settings(),
        );
        let in_flight = accept_loop.run().await;

        inner.coordinator.mark_draining();
        let drained = drain(in_flight).await;
        debug_assert_eq!(inner.gate.active(), 0);

        tracing::info!(drained, "Echo server stopped");
        Ok(())
    }

    /// Stop accepting, close the listener and wait for every handler.
    ///
    /// Idempotent. When this returns no handler is running.
    pub async fn shutdown(&self) {
        self.inner.coordinator.shutdown().await;
    }

    /// Wait until the server is listening and return the bound address.
    ///
    /// `None` if the server stopped (or failed to bind) first.
    pub async fn listening(&self) -> Option<SocketAddr> {
        self.inner.coordinator.listening().await
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.inner.coordinator.phase()
    }

    /// Connections currently holding a slot.
    pub fn active_connections(&self) -> usize {
        self.inner.gate.active()
    }

    /// Configured connection cap.
    pub fn max_connections(&self) -> usize {
        self.inner.gate.max()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }
}

/// Marks the server stopped when `start()` exits, including when its future
/// is dropped. Dropping the future also drops the handler tasks.
struct StopOnExit<'a>(&'a ShutdownCoordinator);

impl Drop for StopOnExit<'_> {
    fn drop(&mut self) {
        self.0.mark_stopped();
    }
}
