//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read configuration from a JSON file without semantic validation.
///
/// For callers that adjust the config before validating it.
pub fn read_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Parse and validate configuration from a JSON string.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = serde_json::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_address_only_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ServerAddress": "127.0.0.1:9090"}}"#).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server_address, "127.0.0.1:9090");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.read_buffer_size, 1024);
        assert_eq!(config.idle_timeout_secs, None);
    }

    #[test]
    fn parses_optional_fields() {
        let config = parse_config(
            r#"{
                "ServerAddress": "0.0.0.0:7000",
                "MaxConnections": 64,
                "ReadBufferSize": 4096,
                "IdleTimeoutSecs": 30,
                "MetricsAddress": "127.0.0.1:9100",
                "LogFilter": "echo_gate=debug"
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_connections, 64);
        assert_eq!(config.read_buffer_size, 4096);
        assert_eq!(config.idle_timeout_secs, Some(30));
        assert_eq!(config.metrics_address.as_deref(), Some("127.0.0.1:9100"));
        assert_eq!(config.log_filter, "echo_gate=debug");
    }

    #[test]
    fn read_defers_validation_to_caller() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"ServerAddress": "127.0.0.1:9090", "MaxConnections": 0}}"#
        )
        .unwrap();

        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Validation(_))
        ));

        let mut config = read_config(file.path()).unwrap();
        assert_eq!(config.max_connections, 0);
        config.max_connections = 8;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_config(r#"{"ServerAddress": "#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_values_are_validation_errors() {
        let err = parse_config(r#"{"ServerAddress": "x", "MaxConnections": 0}"#).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
