//! TCP echo server with bounded admission and graceful shutdown.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod server;

pub use config::ServerConfig;
pub use error::ServerError;
pub use lifecycle::ShutdownSignal;
pub use server::Server;
