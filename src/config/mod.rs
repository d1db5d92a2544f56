//! Configuration management for ConvertBox
//!
//! This module provides a layered configuration system that loads settings
//! from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use convertbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the
//! pattern `CONVERTBOX__<section>__<key>`:
//!
//! - `CONVERTBOX__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `CONVERTBOX__ENGINE__KIND=library`
//! - `CONVERTBOX__RETENTION__ARTIFACT_TTL_HOURS=48`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/convertbox.toml`.
//! This can be overridden using the `CONVERTBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    ApiLimits, Config, EngineConfig, EngineKind, FetchSettings, RetentionConfig, ServerConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or the loaded
    /// values fail validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[engine]
kind = "library"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.engine.kind, EngineKind::Library);
    }

    #[test]
    fn test_validation_catches_zero_ttl() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[retention]
artifact_ttl_hours = 0
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::ZeroArtifactTtl)
        ));
    }

    #[test]
    fn test_full_config_example() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "0.0.0.0:8080"
ledger_path = "data/artifacts"
work_dir = "data/work"

[server.api]
max_payload_bytes = "10MB"
max_parameters = 16
max_parameter_depth = 3

[engine]
kind = "magick"
magick_binary = "/usr/local/bin/magick"
handler_timeout_secs = 120

[retention]
artifact_ttl_hours = 24

[fetch]
connect_timeout_secs = 5
request_timeout_secs = 30
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.api.max_parameters, 16);
        assert_eq!(config.engine.magick_binary, "/usr/local/bin/magick");
        assert_eq!(
            config.engine.handler_timeout(),
            Some(std::time::Duration::from_secs(120))
        );
        assert_eq!(config.retention.artifact_ttl_hours, 24);
        assert_eq!(config.fetch.connect_timeout_secs, 5);
    }
}
