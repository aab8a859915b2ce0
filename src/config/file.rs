//! Configuration file loading.
//!
//! This module handles loading configuration from TOML files at
//! XDG-compliant locations.

use crate::config::types::AppConfig;
use crate::error::{ConfigError, ConfigErrorKind};
use std::path::{Path, PathBuf};

/// Default configuration file name for project-local config.
const LOCAL_CONFIG_NAME: &str = "furhat-dialogue.toml";

/// Default configuration file name within XDG config directory.
const XDG_CONFIG_NAME: &str = "config.toml";

/// Application name for XDG directory lookup.
const APP_NAME: &str = "furhat-dialogue";

/// Loads configuration from the default search paths.
///
/// Search order:
/// 1. `./furhat-dialogue.toml` (project-local)
/// 2. `~/.config/furhat-dialogue/config.toml` (XDG config)
///
/// Returns the default configuration if no config file is found.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be parsed.
pub fn load() -> Result<AppConfig, ConfigError> {
    match search_paths().into_iter().find(|path| path.exists()) {
        Some(path) => from_path(&path),
        None => Ok(AppConfig::default()),
    }
}

/// Loads configuration from a specific file path.
///
/// # Errors
///
/// Returns an error if the file cannot be read, contains invalid TOML, or
/// doesn't match the expected schema.
///
/// # Example
///
/// ```rust,ignore
/// use furhat_dialogue::config::from_path;
/// use std::path::Path;
///
/// let config = from_path(Path::new("/etc/furhat-dialogue/config.toml"))?;
/// ```
pub fn from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::file_error(Some(path.to_path_buf()), format!("failed to read: {}", e))
    })?;

    from_str(&contents).map_err(|e| match e.kind {
        ConfigErrorKind::FileError { path: None, reason } => {
            ConfigError::file_error(Some(path.to_path_buf()), reason)
        }
        kind => ConfigError::new(kind),
    })
}

/// Parses configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or doesn't match the schema.
///
/// # Example
///
/// ```rust,ignore
/// use furhat_dialogue::config::from_str;
///
/// let config = from_str(r#"
/// [robot]
/// host = "192.168.1.20"
/// "#)?;
/// assert_eq!(config.robot.port, 54321);
/// ```
pub fn from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    toml::from_str(toml_str)
        .map_err(|e| ConfigError::file_error(None, format!("invalid TOML: {e}")))
}

/// Loads variables from a `.env` file in the working directory or one of its
/// parents, returning the file that was read.
///
/// Variables already present in the process environment are left alone, so
/// an exported `GOOGLE_API_KEY` wins over the one in `.env`.
///
/// # Errors
///
/// Returns an error if a `.env` file exists but cannot be read or parsed.
pub fn load_dotenv() -> Result<Option<PathBuf>, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(ConfigError::file_error(
            Some(PathBuf::from(".env")),
            e.to_string(),
        )),
    }
}

/// Loads variables from a specific env file without overriding existing ones.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_dotenv_from(path: &Path) -> Result<(), ConfigError> {
    dotenvy::from_path(path)
        .map_err(|e| ConfigError::file_error(Some(path.to_path_buf()), e.to_string()))
}

/// Returns the paths that would be searched for configuration files.
///
/// This is useful for diagnostics and user guidance.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_NAME)];

    if let Some(config_dir) = xdg_config_dir() {
        paths.push(config_dir.join(XDG_CONFIG_NAME));
    }

    paths
}

/// Returns the path to the XDG config directory for this application.
///
/// This is `~/.config/furhat-dialogue` on most systems.
#[must_use]
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}
