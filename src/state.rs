//! On-disk locations and config loading.
//!
//! Everything lives under `~/.schooldigest/`:
//! - `config.json`: folder and document IDs, timezone
//! - `google/credentials.json`: OAuth client (Desktop App type)
//! - `google/token.json`: OAuth token, written by `schooldigest auth`

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DigestError;
use crate::types::Config;

/// Root directory for local state.
pub fn state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".schooldigest")
}

/// Default config file path.
pub fn default_config_path() -> PathBuf {
    state_dir().join("config.json")
}

/// Load and validate the config, from `path` or the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config, DigestError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    if !config_path.exists() {
        return Err(DigestError::ConfigNotFound(config_path));
    }

    let content = fs::read_to_string(&config_path)?;
    let config: Config = serde_json::from_str(&content).map_err(|e| {
        DigestError::Configuration(format!(
            "Failed to parse {}: {}",
            config_path.display(),
            e
        ))
    })?;

    config.validate()?;
    log::debug!("Loaded config from {}", config_path.display());
    Ok(config)
}
