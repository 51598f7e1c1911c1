//! Configuration validation.
//!
//! Returns every problem found, not just the first.

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// Largest accepted `ReadBufferSize`.
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("ServerAddress {0:?} is not of the form host:port")]
    InvalidAddress(String),
    #[error("MaxConnections must be at least 1")]
    ZeroMaxConnections,
    #[error("ReadBufferSize must be between 1 and {max}, got {0}", max = MAX_READ_BUFFER_SIZE)]
    ReadBufferSize(usize),
    #[error("IdleTimeoutSecs must be at least 1 when set")]
    ZeroIdleTimeout,
    #[error("MetricsAddress {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_host_port(&config.server_address) {
        errors.push(ValidationError::InvalidAddress(config.server_address.clone()));
    }
    if config.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.read_buffer_size == 0 || config.read_buffer_size > MAX_READ_BUFFER_SIZE {
        errors.push(ValidationError::ReadBufferSize(config.read_buffer_size));
    }
    if config.idle_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroIdleTimeout);
    }
    if let Some(addr) = &config.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` with a non-empty host and a numeric port. Hostnames are
/// resolved at bind time.
fn is_host_port(address: &str) -> bool {
    if address.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match address.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn accepts_hostnames_and_ipv6() {
        for address in ["localhost:8080", "[::1]:9000", "0.0.0.0:0"] {
            let config = ServerConfig::with_address(address);
            assert_eq!(validate_config(&config), Ok(()), "{address}");
        }
    }

    #[test]
    fn reports_every_error() {
        let config = ServerConfig {
            server_address: "no-port".into(),
            max_connections: 0,
            read_buffer_size: 0,
            idle_timeout_secs: Some(0),
            metrics_address: Some("nowhere".into()),
            ..ServerConfig::default()
        };

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidAddress("no-port".into()),
                ValidationError::ZeroMaxConnections,
                ValidationError::ReadBufferSize(0),
                ValidationError::ZeroIdleTimeout,
                ValidationError::InvalidMetricsAddress("nowhere".into()),
            ]
        );
    }

    #[test]
    fn rejects_oversized_buffer() {
        let config = ServerConfig {
            read_buffer_size: MAX_READ_BUFFER_SIZE + 1,
            ..ServerConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
