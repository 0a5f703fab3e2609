//! Configuration validation.

use crate::{ConfigError, ConfigResult, VigilConfig};

/// Validates a loaded configuration.
///
/// Catches settings that would silently break the protocol: zero cadences,
/// a zero-attempt reconnect ladder, empty endpoints.
pub fn validate_config(config: &VigilConfig) -> ConfigResult<()> {
    if config.service.http_base.is_empty() {
        return Err(ConfigError::ValidationError(
            "service.http_base must not be empty".to_string(),
        ));
    }
    if !config.service.http_base.starts_with("http://")
        && !config.service.http_base.starts_with("https://")
    {
        return Err(ConfigError::InvalidValue(format!(
            "service.http_base '{}' must use http:// or https://",
            config.service.http_base
        )));
    }
    if config.service.ws_base.is_empty() {
        return Err(ConfigError::ValidationError(
            "service.ws_base must not be empty".to_string(),
        ));
    }
    if config.capture.frame_interval_ms == 0 {
        return Err(ConfigError::InvalidValue(
            "capture.frame_interval_ms must be positive".to_string(),
        ));
    }
    if config.channel.reconnect_base_delay_ms == 0 {
        return Err(ConfigError::InvalidValue(
            "channel.reconnect_base_delay_ms must be positive".to_string(),
        ));
    }
    if config.channel.max_reconnect_attempts == 0 {
        return Err(ConfigError::InvalidValue(
            "channel.max_reconnect_attempts must be at least 1".to_string(),
        ));
    }
    if config.risk.recent_events_limit == 0 {
        return Err(ConfigError::InvalidValue(
            "risk.recent_events_limit must be at least 1".to_string(),
        ));
    }
    Ok(())
}
