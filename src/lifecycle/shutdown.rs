//! Shutdown coordination for the server.
//!
//! Order of a shutdown:
//! 1. Flip the [`ShutdownSignal`]
//! 2. The accept loop observes it and closes the listening socket
//! 3. Every in-flight handler is joined
//! 4. The server phase moves to [`Phase::Stopped`], waking every waiter

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::error::ServerError;

/// One-shot, broadcast-once cancellation token.
///
/// Moves from "not requested" to "requested" once; later requests are no-ops.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Returns `true` only for the call that flipped it.
    pub fn request(&self) -> bool {
        self.tx.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                true
            }
        })
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once shutdown has been requested.
    pub async fn requested(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Server lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Never started.
    Idle,
    /// Binding the listening socket.
    Starting,
    /// Accepting connections on the given address.
    Running(SocketAddr),
    /// Listener closed; waiting for handlers to finish.
    Draining,
    /// Fully stopped. Terminal.
    Stopped,
}

/// Owns the shutdown signal and the server phase.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    phase: watch::Sender<Phase>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            signal: ShutdownSignal::new(),
            phase,
        }
    }

    /// The signal observed by the accept loop.
    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Move `Idle → Starting`.
    ///
    /// Fails if the server already started or shutdown was requested.
    pub fn begin_start(&self) -> Result<(), ServerError> {
        let mut previous = Phase::Idle;
        let claimed = self.phase.send_if_modified(|phase| {
            previous = *phase;
            if *phase == Phase::Idle {
                *phase = Phase::Starting;
                true
            } else {
                false
            }
        });

        if !claimed {
            return Err(match previous {
                Phase::Stopped => ServerError::ShutDown,
                _ => ServerError::AlreadyStarted,
            });
        }

        // `shutdown()` flips the signal before reading the phase, and we set
        // the phase before reading the signal, so one side always sees the other.
        if self.signal.is_requested() {
            self.set(Phase::Stopped);
            return Err(ServerError::ShutDown);
        }
        Ok(())
    }

    pub(crate) fn mark_running(&self, addr: SocketAddr) {
        self.set(Phase::Running(addr));
    }

    pub(crate) fn mark_draining(&self) {
        self.set(Phase::Draining);
    }

    pub(crate) fn mark_stopped(&self) {
        self.set(Phase::Stopped);
    }

    /// Wait for the listening address. `None` if the server stopped first.
    pub async fn listening(&self) -> Option<SocketAddr> {
        let mut rx = self.phase.subscribe();
        let phase = rx
            .wait_for(|phase| matches!(phase, Phase::Running(_) | Phase::Stopped))
            .await
            .map(|phase| *phase)
            .ok()?;

        match phase {
            Phase::Running(addr) => Some(addr),
            _ => None,
        }
    }

    /// Request shutdown and wait until every handler has finished.
    ///
    /// Safe to call any number of times, from any task. Returns immediately
    /// if the server never started or is already stopped.
    pub async fn shutdown(&self) {
        if self.signal.request() {
            tracing::info!("Shutdown requested");
        }

        let mut rx = self.phase.subscribe();
        let _ = rx
            .wait_for(|phase| matches!(phase, Phase::Idle | Phase::Stopped))
            .await;
    }

    fn set(&self, next: Phase) {
        self.phase.send_replace(next);
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Join every task in `tasks`. Returns how many were joined.
pub async fn drain(mut tasks: JoinSet<()>) -> usize {
    let pending = tasks.len();
    if pending > 0 {
        tracing::info!(pending, "Waiting for connections to finish");
    }

    let mut joined = 0;
    while let Some(result) = tasks.join_next().await {
        joined += 1;
        if let Err(e) = result {
            if e.is_panic() {
                tracing::error!(error = %e, "Connection handler panicked");
            }
        }
    }
    joined
}
