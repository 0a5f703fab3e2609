//! Configuration file loading with override support
//!
//! Two-tier loading: the TOML file provides the base values, then `VIGIL_*`
//! environment variables override individual settings at runtime.

use crate::{validate_config, ConfigError, ConfigResult, VigilConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "vigil_configuration.toml";

/// Find the vigil configuration file
///
/// Search order:
/// 1. `VIGIL_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Ancestor directories (up to 5 levels, for workspace layouts)
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("VIGIL_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by VIGIL_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd;
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent.to_path_buf();
                }
                None => break,
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{CONFIG_FILE_NAME}' not found in any of these locations:\n{search_list}\n\nSet VIGIL_CONFIG_PATH to specify a custom location."
    )))
}

/// Load configuration from a TOML file and apply environment overrides.
///
/// With `config_path = None` the file is discovered via [`find_config_file`];
/// a missing file falls back to built-in defaults so a bare checkout still
/// runs against a local detection service.
pub fn load_config(config_path: Option<&Path>) -> ConfigResult<VigilConfig> {
    let mut config = match config_path {
        Some(path) => parse_file(path)?,
        None => match find_config_file() {
            Ok(path) => parse_file(&path)?,
            Err(ConfigError::FileNotFound(_)) => VigilConfig::default(),
            Err(e) => return Err(e),
        },
    };

    apply_environment_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

fn parse_file(path: &Path) -> ConfigResult<VigilConfig> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply `VIGIL_*` environment variable overrides.
pub fn apply_environment_overrides(config: &mut VigilConfig) {
    if let Ok(v) = env::var("VIGIL_SERVICE_HTTP_BASE") {
        config.service.http_base = v;
    }
    if let Ok(v) = env::var("VIGIL_SERVICE_WS_BASE") {
        config.service.ws_base = v;
    }
    if let Ok(v) = env::var("VIGIL_FRAME_INTERVAL_MS") {
        if let Ok(parsed) = v.parse() {
            config.capture.frame_interval_ms = parsed;
        }
    }
    if let Ok(v) = env::var("VIGIL_MAX_RECONNECT_ATTEMPTS") {
        if let Ok(parsed) = v.parse() {
            config.channel.max_reconnect_attempts = parsed;
        }
    }
    if let Ok(v) = env::var("VIGIL_LOG_LEVEL") {
        config.logging.level = v;
    }
}
