//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop)
//!     → admission.rs (slot granted? otherwise close immediately)
//!     → connection.rs (echo until peer closes, then release slot)
//! ```
//!
//! # Design Decisions
//! - Reject-on-full instead of queueing keeps shutdown drain bounded
//! - Each handler task is tracked so shutdown can join it

pub mod admission;
pub mod connection;
pub mod listener;

pub use admission::{AdmissionGate, SlotPermit};
pub use connection::{handle_connection, ConnectionId, ConnectionOutcome, HandlerSettings};
pub use listener::{Accept, AcceptLoop, Listener, ListenerError};
