//! Logging initialization.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize console logging for the proctoring client.
///
/// Filter resolution order:
/// 1. `RUST_LOG` environment variable, when set
/// 2. the `default_level` argument (typically from `[logging]` config)
///
/// # Arguments
/// * `default_level` - Fallback filter directive, e.g. `"info"` or
///   `"vigil_client=debug,info"`
///
/// Calling this twice returns an error from the underlying subscriber; embed
/// it once at application startup.
pub fn init_logging(default_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("Invalid log filter directive: {default_level}"))?;

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_is_an_error() {
        // Ensure the fallback directive is what gets parsed.
        std::env::remove_var("RUST_LOG");
        assert!(init_logging("not a [valid] directive==").is_err());
    }
}
