//! Server configuration
//!
//! Built once at startup (from the CLI in the binary, or directly in tests) and
//! handed to the application state. Nothing in the request path reads global
//! settings.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::generation::GeneratorLanguage;
use crate::infrastructure::DEFAULT_PROGRAM;

/// Port the server listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 80;

/// Ceiling for a single generator run
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Specification generated when a request does not name one
pub const DEFAULT_INPUT_SPEC: &str = "https://github.com/Azure/azure-rest-api-specs/blob/27c79e5cf0a222441b18828ae81551308e84c758/specification/batch/resource-manager/readme.md";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Generator executable, resolved from `PATH` when it is a bare name
    pub generator_program: String,
    pub generation_timeout: Duration,
    pub default_language: GeneratorLanguage,
    pub default_input_specs: Vec<String>,
    /// Directory that holds the per-request output directories. `None` uses the
    /// system temp directory.
    pub output_root: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            generator_program: DEFAULT_PROGRAM.to_string(),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            default_language: GeneratorLanguage::GO,
            default_input_specs: vec![DEFAULT_INPUT_SPEC.to_string()],
            output_root: None,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generator_program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "generator program cannot be empty".to_string(),
            ));
        }
        if self.generation_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "generation timeout must be greater than zero".to_string(),
            ));
        }
        if self.default_input_specs.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one default input specification is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.port, 80);
        assert_eq!(config.generator_program, "autorest");
        assert_eq!(config.generation_timeout, Duration::from_secs(300));
        assert_eq!(config.default_language, GeneratorLanguage::GO);
        assert_eq!(config.default_input_specs, vec![DEFAULT_INPUT_SPEC]);
        assert_eq!(config.output_root, None);
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:80");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ServerConfig {
            generator_program: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            generation_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "Invalid configuration: generation timeout must be greater than zero"
        );

        let config = ServerConfig {
            default_input_specs: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
