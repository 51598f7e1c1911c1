//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::net::connection::HandlerSettings;

/// Root configuration for the echo server.
///
/// Keys use the PascalCase names of the on-disk document, e.g.
/// `{"ServerAddress": "127.0.0.1:8080"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ServerConfig {
    /// Listen address (`host:port`).
    pub server_address: String,

    /// Maximum concurrent connections. Further connections are refused.
    pub max_connections: usize,

    /// Bytes read per chunk by each connection.
    pub read_buffer_size: usize,

    /// Close connections idle for this many seconds. Disabled when absent.
    pub idle_timeout_secs: Option<u64>,

    /// Prometheus scrape endpoint. Disabled when absent.
    pub metrics_address: Option<String>,

    /// Default tracing filter, overridden by `RUST_LOG`.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:8080".to_string(),
            max_connections: 5,
            read_buffer_size: 1024,
            idle_timeout_secs: None,
            metrics_address: None,
            log_filter: "echo_gate=info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Config listening on `address` with defaults otherwise.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            server_address: address.into(),
            ..Self::default()
        }
    }

    /// Per-connection handler settings derived from this config.
    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            read_buffer_size: self.read_buffer_size,
            idle_timeout: self.idle_timeout_secs.map(Duration::from_secs),
        }
    }
}
