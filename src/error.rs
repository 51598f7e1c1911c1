//! Error types for the server.

use crate::net::listener::ListenerError;

/// Errors returned by [`Server::start`](crate::Server::start).
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening socket could not be set up. Terminal.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// `start()` was already called on this server.
    #[error("server already started")]
    AlreadyStarted,
    /// Shutdown was requested before the server could start.
    #[error("server has been shut down")]
    ShutDown,
}
