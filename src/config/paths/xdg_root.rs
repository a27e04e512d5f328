//! XDG Base Directory utilities for global configuration and state.

use crate::error::ForgeError;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "bedrock-forge";

/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_home() -> Result<PathBuf, ForgeError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        ForgeError::ConfigError(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// `$XDG_CONFIG_HOME/bedrock-forge/config.toml`
pub fn global_config_path() -> Result<PathBuf, ForgeError> {
    Ok(config_home()?.join(APP_DIR).join("config.toml"))
}

/// Platform state directory, optionally namespaced by the canonical
/// workspace path so each workspace gets its own log.
///
/// `/home/user/defs` becomes `<state>/home/user/defs/`.
pub fn state_dir(workspace: Option<&Path>) -> Result<PathBuf, ForgeError> {
    let project_dirs = directories::ProjectDirs::from("", "", APP_DIR).ok_or_else(|| {
        ForgeError::ConfigError("Could not determine platform state directory".to_string())
    })?;
    let base = project_dirs
        .state_dir()
        .unwrap_or_else(|| project_dirs.data_local_dir())
        .to_path_buf();

    let Some(workspace) = workspace else {
        return Ok(base);
    };
    let canonical = workspace.canonicalize().map_err(|e| {
        ForgeError::ConfigError(format!("Failed to canonicalize workspace path: {}", e))
    })?;
    let mut dir = base;
    for component in canonical.components() {
        if let std::path::Component::Normal(name) = component {
            dir = dir.join(name);
        }
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_path_ends_with_app_file() {
        if let Ok(path) = global_config_path() {
            assert!(path.ends_with("bedrock-forge/config.toml"));
        }
    }
}
