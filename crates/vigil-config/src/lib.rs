//! # Vigil Configuration System
//!
//! Type-safe configuration loader for the proctoring client with support for:
//! - TOML file parsing
//! - Environment variable overrides (`VIGIL_*`)
//! - Validation of timing and endpoint settings
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vigil_config::load_config;
//!
//! let config = load_config(None).expect("Failed to load config");
//! println!("Detection service: {}", config.service.http_base);
//! println!("Frame cadence: {}ms", config.capture.frame_interval_ms);
//! ```
//!
//! No timing policy is hardcoded in the state machines; the reconnect ladder,
//! frame cadence, violation dwell, and roster grace period all come from here
//! (with defaults matching the canonical protocol behavior).

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{apply_environment_overrides, find_config_file, load_config};
pub use types::*;
pub use validation::validate_config;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = VigilConfig::default();
        validate_config(&config).expect("defaults must be valid");
    }
}
