//! MergeService: orchestrates sources, applies merge policy, deserializes to ForgeConfig.

use crate::config::sources::{environment, global_file, workspace_file};
use crate::config::ForgeConfig;
use config::{ConfigError, File};
use std::path::Path;
use tracing::debug;

use super::merge_policy;

pub struct MergeService;

impl MergeService {
    /// Precedence: global file (lowest) -> workspace `forge.toml` -> environment (highest).
    pub fn load(workspace_root: &Path) -> Result<ForgeConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder)?;

        let config = builder.build()?;
        debug!(workspace = %workspace_root.display(), "Loaded layered configuration");
        config.try_deserialize()
    }

    /// Load config from a specific file with environment overlay. The file
    /// must exist.
    pub fn load_from_file(path: &Path) -> Result<ForgeConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        let builder = environment::add_to_builder(builder)?;

        let config = builder.build()?;
        debug!(file = %path.display(), "Loaded configuration file");
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_workspace_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("forge.toml"),
            "[generator]\nmodule_registry = \"git::https://example.com/modules\"\nemit_json = true\n",
        )
        .unwrap();
        let config = MergeService::load(dir.path()).unwrap();
        assert_eq!(config.generator.module_registry, "git::https://example.com/modules");
        assert!(config.generator.emit_json);
        assert_eq!(config.generator.module_version, "v1.0.0");
    }

    #[test]
    fn test_missing_workspace_file_is_fine() {
        let dir = TempDir::new().unwrap();
        let config = MergeService::load(dir.path()).unwrap();
        assert_eq!(config.generator.project_name, "bedrock-project");
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = TempDir::new().unwrap();
        assert!(MergeService::load_from_file(&dir.path().join("absent.toml")).is_err());

        let path = dir.path().join("custom.toml");
        fs::write(&path, "[pipeline]\nallow_parse_errors = true\n").unwrap();
        let config = MergeService::load_from_file(&path).unwrap();
        assert!(config.pipeline.allow_parse_errors);
    }
}
