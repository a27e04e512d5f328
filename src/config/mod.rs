//! Configuration
//!
//! Layered configuration for bedrock-forge. Values are merged, lowest
//! precedence first, from built-in defaults, the global
//! `~/.config/bedrock-forge/config.toml`, the workspace `forge.toml` and
//! `FORGE__SECTION__KEY` environment variables.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
pub mod workspace;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the workspace configuration.
pub const WORKSPACE_CONFIG_FILE: &str = "forge.toml";
pub const DEFAULT_MODULE_REGISTRY: &str = "git::https://github.com/company/bedrock-terraform-modules";
pub const DEFAULT_MODULE_VERSION: &str = "v1.0.0";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub scan: ScanSection,

    #[serde(default)]
    pub packaging: PackagingSection,

    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub validation: ValidationSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Terraform generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Base source of the Bedrock module collection. Required.
    #[serde(default = "default_module_registry")]
    pub module_registry: String,

    /// `?ref=` pin appended to module sources; empty disables pinning.
    #[serde(default = "default_module_version")]
    pub module_version: String,

    #[serde(default = "default_project_name")]
    pub project_name: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    /// AWS provider region; omitted from the provider block when unset.
    #[serde(default)]
    pub region: Option<String>,

    /// Output directory, relative to the scanned path.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Also write `main.tf.json`.
    #[serde(default)]
    pub emit_json: bool,
}

fn default_module_registry() -> String {
    DEFAULT_MODULE_REGISTRY.to_string()
}

fn default_module_version() -> String {
    DEFAULT_MODULE_VERSION.to_string()
}

fn default_project_name() -> String {
    "bedrock-project".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("terraform")
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            module_registry: default_module_registry(),
            module_version: default_module_version(),
            project_name: default_project_name(),
            environment: default_environment(),
            region: None,
            output_dir: default_output_dir(),
            emit_json: false,
        }
    }
}

/// Directory scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSection {
    /// Include globs; empty means every `.yml`/`.yaml` file.
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default = "default_scan_exclude")]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_scan_exclude() -> Vec<String> {
    crate::scanner::default_exclude_patterns()
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: default_scan_exclude(),
            follow_symlinks: false,
        }
    }
}

/// Artifact packaging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagingSection {
    #[serde(default)]
    pub enabled: bool,

    /// Target bucket; required when packaging is enabled.
    #[serde(default)]
    pub bucket: String,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Root of the local object store (relative to the workspace root).
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// A Lambda that failed to package fails generation.
    #[serde(default)]
    pub fail_on_error: bool,

    #[serde(default = "default_packaging_exclude")]
    pub exclude: Vec<String>,
}

fn default_key_prefix() -> String {
    "bedrock-forge".to_string()
}

pub(crate) fn default_store_dir() -> PathBuf {
    PathBuf::from(".bedrock-forge/artifacts")
}

fn default_packaging_exclude() -> Vec<String> {
    crate::packager::default_exclude_patterns()
}

impl Default for PackagingSection {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: String::new(),
            key_prefix: default_key_prefix(),
            store_dir: default_store_dir(),
            fail_on_error: false,
            exclude: default_packaging_exclude(),
        }
    }
}

/// Pipeline policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Generate even when some documents failed to parse.
    #[serde(default)]
    pub allow_parse_errors: bool,
}

/// Policy validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSection {
    /// Built-in profile: `default` or `enterprise`.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Explicit validation config; otherwise `validation.yml` in the scanned
    /// path is used when present.
    #[serde(default)]
    pub config_path: Option<PathBuf>,
}

fn default_profile() -> String {
    "default".to_string()
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            config_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ForgeConfig::default();
        assert_eq!(config.generator.module_registry, DEFAULT_MODULE_REGISTRY);
        assert_eq!(config.generator.module_version, "v1.0.0");
        assert_eq!(config.generator.output_dir, PathBuf::from("terraform"));
        assert!(config.generator.region.is_none());
        assert!(!config.packaging.enabled);
        assert!(config.scan.exclude.contains(&"**/.git/**".to_string()));
        assert_eq!(config.validation.profile, "default");
        assert!(!config.pipeline.allow_parse_errors);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ForgeConfig = toml::from_str(
            "[generator]\nproject_name = \"support\"\nregion = \"eu-west-1\"\n\n[packaging]\nenabled = true\nbucket = \"artifacts\"\n",
        )
        .unwrap();
        assert_eq!(config.generator.project_name, "support");
        assert_eq!(config.generator.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.generator.environment, "dev");
        assert_eq!(config.packaging.key_prefix, "bedrock-forge");
        assert!(config.packaging.exclude.contains(&"node_modules".to_string()));
    }
}
