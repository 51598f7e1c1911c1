//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Accept loop and handlers produce:
//!     → logging.rs (structured tracing events, per-connection spans)
//!     → metrics.rs (counters and the active-connections gauge)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
