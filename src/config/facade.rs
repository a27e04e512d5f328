//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::ForgeConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file, the workspace `forge.toml`
    /// and the environment.
    pub fn load(workspace_root: &Path) -> Result<ForgeConfig, ConfigError> {
        MergeService::load(workspace_root)
    }

    /// Load configuration from a specific file with the environment on top.
    pub fn load_from_file(path: &Path) -> Result<ForgeConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    pub fn default() -> ForgeConfig {
        ForgeConfig::default()
    }
}
