pub mod schema;

pub use schema::{CommandeerConfig, InterpreterKind};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default commandeer home directory (~/.commandeer).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".commandeer"))
        .unwrap_or_else(|| PathBuf::from(".commandeer"))
}

/// Default config file path (~/.commandeer/commandeer.toml).
pub fn default_config_path() -> PathBuf {
    default_home_dir().join("commandeer.toml")
}

/// Expand a user-supplied path that may contain `~`.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<CommandeerConfig> {
    if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read commandeer config file")?;
        let config: CommandeerConfig =
            toml::from_str(&contents).context("Failed to parse commandeer config (TOML)")?;
        Ok(config)
    } else {
        Ok(CommandeerConfig::default())
    }
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &CommandeerConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}
