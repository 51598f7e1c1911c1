//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     shutdown() → flip signal → accept loop closes listener
//!         → drain in-flight handlers → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown()
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative: handlers blocked on a peer read are not
//!   interrupted, they finish when the peer closes
//! - Shutdown has no deadline; an idle timeout bounds it when configured

pub mod shutdown;
pub mod signals;

pub use shutdown::{Phase, ShutdownCoordinator, ShutdownSignal};
