//! User configuration loading for orikomi.
//!
//! This module handles loading user-wide configuration from the XDG config directory.
//! User config location: $XDG_CONFIG_HOME/orikomi/orikomi.toml
//! Fallback: the platform config directory (`dirs::config_dir()`)

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::settings::FoldingSettings;

/// Errors raised while reading a configuration file
#[derive(Debug, Error)]
pub enum UserConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type UserConfigResult<T> = Result<T, UserConfigError>;

const CONFIG_DIR_NAME: &str = "orikomi";
const CONFIG_FILE_NAME: &str = "orikomi.toml";

/// Returns the path to the user configuration file.
///
/// The path is determined by:
/// 1. If $XDG_CONFIG_HOME is set: $XDG_CONFIG_HOME/orikomi/orikomi.toml
/// 2. Otherwise: the platform config directory
///
/// Returns None if no config directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return Some(
            PathBuf::from(xdg_config)
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
    }

    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load a configuration file.
///
/// A missing file is not an error and yields `Ok(None)`.
pub fn load_config_file(path: &Path) -> UserConfigResult<Option<FoldingSettings>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(UserConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    toml::from_str(&content)
        .map(Some)
        .map_err(|source| UserConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Load the user-wide configuration file, if any
pub fn load_user_config() -> UserConfigResult<Option<FoldingSettings>> {
    match user_config_path() {
        Some(path) => load_config_file(&path),
        None => Ok(None),
    }
}
