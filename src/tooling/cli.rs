//! CLI Tooling
//!
//! Command-line interface over the load, validate and generate pipeline.
//! Every command is scoped to a workspace root and returns its rendered
//! output; the binary decides how to print it.

use crate::config::{ConfigLoader, ForgeConfig};
use crate::error::ForgeError;
use crate::pipeline::{GenerateOptions, Pipeline};
use crate::tooling::format::{
    format_generate_json, format_generate_text, format_inventory_json, format_inventory_text,
    format_validation_json, format_validation_text, OutputFormat,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Bedrock Forge - Terraform generation for Bedrock resource definitions
#[derive(Parser)]
#[command(name = "bedrock-forge", version)]
#[command(about = "Scan, validate and generate Terraform for Bedrock YAML resources")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List discovered resources grouped by kind
    Scan {
        /// Directory to scan (defaults to the workspace root)
        path: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Check resources against naming, tagging and security policies
    Validate {
        /// Directory to validate (defaults to the workspace root)
        path: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Built-in rule profile (default, enterprise)
        #[arg(long)]
        profile: Option<String>,
        /// Validation rules file (overrides validation.yml discovery)
        #[arg(long)]
        validation_config: Option<PathBuf>,
    },
    /// Package artifacts and write Terraform
    Generate {
        /// Directory to scan (defaults to the workspace root)
        path: Option<PathBuf>,
        /// Output directory (defaults to the configured output_dir under PATH)
        output_dir: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Skip Lambda and schema packaging
        #[arg(long)]
        skip_packaging: bool,
        /// Generate even when some documents failed to parse
        #[arg(long)]
        allow_parse_errors: bool,
    },
    /// Print version information
    Version,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Scan { .. } => "scan",
            Commands::Validate { .. } => "validate",
            Commands::Generate { .. } => "generate",
            Commands::Version => "version",
        }
    }
}

/// CLI context for executing commands
pub struct CliContext {
    workspace_root: PathBuf,
    config: ForgeConfig,
}

impl CliContext {
    /// Load configuration for `workspace_root`, or from `config_path` when given.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ForgeError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self {
            workspace_root,
            config,
        })
    }

    /// Build a context from an already loaded configuration.
    pub fn with_config(workspace_root: PathBuf, config: ForgeConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ForgeConfig {
        &mut self.config
    }

    fn resolve_path(&self, path: Option<&Path>) -> PathBuf {
        match path {
            None => self.workspace_root.clone(),
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => self.workspace_root.join(p),
        }
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.config.clone(), self.workspace_root.clone())
    }

    /// Execute a command, returning the rendered output.
    pub fn execute(&self, command: &Commands) -> Result<String, ForgeError> {
        info!(command = command.name(), workspace = %self.workspace_root.display(), "Executing command");
        match command {
            Commands::Scan { path, format } => {
                let format = OutputFormat::parse(format)?;
                let root = self.resolve_path(path.as_deref());
                let (registry, load) = self.pipeline().load(&root)?;
                Ok(match format {
                    OutputFormat::Text => format_inventory_text(&load, &registry),
                    OutputFormat::Json => format_inventory_json(&load, &registry),
                })
            }
            Commands::Validate {
                path,
                format,
                profile,
                validation_config,
            } => {
                let format = OutputFormat::parse(format)?;
                let root = self.resolve_path(path.as_deref());
                let explicit = validation_config.as_deref().map(|p| self.resolve_path(Some(p)));
                let outcome = self
                    .pipeline()
                    .validate(&root, explicit.as_deref(), profile.as_deref())?;
                let rendered = match format {
                    OutputFormat::Text => format_validation_text(&outcome),
                    OutputFormat::Json => format_validation_json(&outcome),
                };
                if outcome.success() {
                    Ok(rendered)
                } else {
                    Err(ForgeError::Validation {
                        count: outcome.error_count(),
                        report: rendered,
                    })
                }
            }
            Commands::Generate {
                path,
                output_dir,
                format,
                skip_packaging,
                allow_parse_errors,
            } => {
                let format = OutputFormat::parse(format)?;
                let root = self.resolve_path(path.as_deref());
                let output_dir = output_dir.as_deref().map(|p| self.resolve_path(Some(p)));
                let options = GenerateOptions {
                    skip_packaging: *skip_packaging,
                    allow_parse_errors: *allow_parse_errors,
                };
                let outcome = self
                    .pipeline()
                    .generate(&root, output_dir.as_deref(), options)?;
                Ok(match format {
                    OutputFormat::Text => format_generate_text(&outcome),
                    OutputFormat::Json => format_generate_json(&outcome),
                })
            }
            Commands::Version => Ok(format!("bedrock-forge {}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    const AGENT: &str = "kind: Agent\nmetadata:\n  name: support-agent\nspec:\n  foundationModel: anthropic.claude-3-sonnet\n  instruction: Help customers with their orders\n";

    fn context(dir: &TempDir) -> CliContext {
        CliContext::with_config(dir.path().to_path_buf(), ForgeConfig::default())
    }

    #[test]
    fn test_resolve_path_relative_to_workspace() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        assert_eq!(ctx.resolve_path(None), dir.path());
        assert_eq!(ctx.resolve_path(Some(Path::new("defs"))), dir.path().join("defs"));
        assert_eq!(ctx.resolve_path(Some(Path::new("/abs"))), PathBuf::from("/abs"));
    }

    #[test]
    fn test_scan_json_groups_by_kind() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("agent.yml"), AGENT).unwrap();
        fs::write(dir.path().join("broken.yml"), "kind: Agent\nmetadata: [\n").unwrap();

        let output = context(&dir)
            .execute(&Commands::Scan {
                path: None,
                format: "json".to_string(),
            })
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["total_resources"], 1);
        assert_eq!(parsed["counts"]["Agent"], 1);
        assert_eq!(parsed["resources"]["Agent"][0]["name"], "support-agent");
        assert_eq!(parsed["warnings"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = context(&dir)
            .execute(&Commands::Scan {
                path: None,
                format: "yaml".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidArgument(_)));
    }

    #[test]
    fn test_validate_failure_carries_report() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("agent.yml"),
            "kind: Agent\nmetadata:\n  name: a\nspec:\n  foundationModel: m\n  instruction: Help customers with their orders\n  guardrail: { name: missing }\n",
        )
        .unwrap();

        let err = context(&dir)
            .execute(&Commands::Validate {
                path: None,
                format: "json".to_string(),
                profile: None,
                validation_config: None,
            })
            .unwrap_err();
        match err {
            ForgeError::Validation { count, report } => {
                assert!(count >= 1);
                let parsed: Value = serde_json::from_str(&report).unwrap();
                assert_eq!(parsed["success"], false);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_generate_writes_main_tf() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("agent.yml"), AGENT).unwrap();

        let output = context(&dir)
            .execute(&Commands::Generate {
                path: None,
                output_dir: Some(PathBuf::from("out")),
                format: "json".to_string(),
                skip_packaging: true,
                allow_parse_errors: false,
            })
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["resources"], 1);
        assert!(parsed["packaging"].is_null());
        assert!(dir.path().join("out").join("main.tf").exists());
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        let output = context(&dir).execute(&Commands::Version).unwrap();
        assert!(output.starts_with("bedrock-forge "));
    }
}
