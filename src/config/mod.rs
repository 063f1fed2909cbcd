pub mod types;

use crate::error::{CloudTrimError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub use types::Config;

const CONFIG_FILE_NAME: &str = ".cloudtrim.toml";

/// Get the global config file path (~/.cloudtrim.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Default location of the persisted resource state.
pub fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cloudtrim/state.json")
}

/// Load configuration from an explicit file, or the global config, or
/// defaults; then apply env overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| CloudTrimError::Config(format!("{}: {e}", path.display())))?;
        return Ok(config.apply_env_overrides());
    }

    if let Some(global) = global_config_path() {
        if global.exists() {
            if let Ok(content) = fs::read_to_string(&global) {
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    return Ok(config.apply_env_overrides());
                }
            }
        }
    }

    Ok(Config::default().apply_env_overrides())
}

/// Save configuration to the global config file.
pub fn save_global_config(config: &Config) -> Result<()> {
    if let Some(path) = global_config_path() {
        let content = toml::to_string_pretty(config)
            .map_err(|e| CloudTrimError::Config(e.to_string()))?;
        fs::write(&path, content)?;
    }
    Ok(())
}
