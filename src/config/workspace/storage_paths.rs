//! Resolution of configured directories against a workspace root.

use crate::config::{GeneratorConfig, PackagingSection};
use crate::packager::PackagerConfig;
use std::path::{Path, PathBuf};

impl GeneratorConfig {
    /// Output directory for a scanned `path`; absolute settings win.
    pub fn resolve_output_dir(&self, path: &Path) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            path.join(&self.output_dir)
        }
    }
}

impl PackagingSection {
    /// Root of the local object store.
    pub fn resolve_store_dir(&self, workspace_root: &Path) -> PathBuf {
        if self.store_dir.is_absolute() {
            self.store_dir.clone()
        } else {
            workspace_root.join(&self.store_dir)
        }
    }

    /// Packager settings; archives are staged under the store's `staging`
    /// directory.
    pub fn packager_config(&self, workspace_root: &Path) -> PackagerConfig {
        PackagerConfig {
            bucket: self.bucket.clone(),
            key_prefix: self.key_prefix.clone(),
            staging_dir: Some(self.resolve_store_dir(workspace_root).join("staging")),
            exclude_patterns: self.exclude.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_join_the_root() {
        let section = PackagingSection::default();
        assert_eq!(
            section.resolve_store_dir(Path::new("/ws")),
            PathBuf::from("/ws/.bedrock-forge/artifacts")
        );
        let config = GeneratorConfig {
            output_dir: PathBuf::from("/abs/out"),
            ..GeneratorConfig::default()
        };
        assert_eq!(config.resolve_output_dir(Path::new("/ws")), PathBuf::from("/abs/out"));
        assert_eq!(
            GeneratorConfig::default().resolve_output_dir(Path::new("/ws")),
            PathBuf::from("/ws/terraform")
        );
    }

    #[test]
    fn test_packager_config_carries_bucket_and_excludes() {
        let section = PackagingSection {
            bucket: "artifacts".to_string(),
            ..PackagingSection::default()
        };
        let config = section.packager_config(Path::new("/ws"));
        assert_eq!(config.bucket, "artifacts");
        assert_eq!(
            config.staging_dir,
            Some(PathBuf::from("/ws/.bedrock-forge/artifacts/staging"))
        );
        assert_eq!(config.exclude_patterns, section.exclude);
    }
}
