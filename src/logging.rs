//! Logging System
//!
//! Structured logging with `tracing`. Level, format and destination come
//! from configuration, overridable by `FORGE_LOG*` environment variables.

use crate::config::xdg;
use crate::error::ForgeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const LOG_FILE_NAME: &str = "bedrock-forge.log";

/// Resolve the log file path with precedence: CLI, FORGE_LOG_FILE env, config file, default.
///
/// The default lives in the platform state directory, namespaced by the
/// workspace when one is given.
pub fn resolve_log_file_path(
    cli_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
    workspace: Option<&Path>,
) -> Result<PathBuf, ForgeError> {
    if let Some(p) = cli_file.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(p);
    }
    if let Ok(env_path) = std::env::var("FORGE_LOG_FILE") {
        if !env_path.is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }
    if let Some(p) = config_file.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(p);
    }
    Ok(xdg::state_dir(workspace)?.join(LOG_FILE_NAME))
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// json or text
    #[serde(default = "default_format")]
    pub format: String,

    /// stdout, stderr, file, file+stderr, both
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file when output includes a file; None means the state directory.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Colored text output on terminals.
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module levels, e.g. `bedrock_forge::generator = "debug"`.
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: BTreeMap::new(),
        }
    }
}

/// Initialize the global subscriber.
///
/// Priority order (highest to lowest):
/// 1. Environment variables (FORGE_LOG, FORGE_LOG_FORMAT, FORGE_LOG_OUTPUT, FORGE_LOG_FILE)
/// 2. The given configuration, which the CLI has already patched with its flags
/// 3. Defaults
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ForgeError> {
    if config.is_some_and(|c| !c.enabled) {
        Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(std::io::sink))
            .try_init()
            .map_err(|e| ForgeError::ConfigError(format!("Failed to install logger: {}", e)))?;
        return Ok(());
    }

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true) && !output.file;
    let writer = make_writer(&output, config.and_then(|c| c.file.clone()))?;

    let subscriber = Registry::default().with(filter);
    let installed = if format == LogFormat::Json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init()
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(use_color)
                    .with_writer(writer),
            )
            .try_init()
    };
    installed.map_err(|e| ForgeError::ConfigError(format!("Failed to install logger: {}", e)))
}

fn make_writer(output: &OutputDestinations, file: Option<PathBuf>) -> Result<BoxMakeWriter, ForgeError> {
    let writer = if output.file {
        let log_file = Arc::new(open_log_file(resolve_log_file_path(None, file, None)?)?);
        if output.stderr {
            BoxMakeWriter::new(log_file.and(std::io::stderr))
        } else {
            BoxMakeWriter::new(log_file)
        }
    } else if output.stdout && output.stderr {
        BoxMakeWriter::new(std::io::stdout.and(std::io::stderr))
    } else if output.stdout {
        BoxMakeWriter::new(std::io::stdout)
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };
    Ok(writer)
}

fn open_log_file(path: PathBuf) -> Result<std::fs::File, ForgeError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ForgeError::ConfigError(format!("Failed to create log directory: {}", e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| ForgeError::ConfigError(format!("Failed to open log file {:?}: {}", path, e)))
}

/// FORGE_LOG wins outright; otherwise the configured level plus module
/// directives from the config and FORGE_LOG_MODULES.
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, ForgeError> {
    if let Ok(filter) = EnvFilter::try_from_env("FORGE_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("warn");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(level);
    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            filter = filter.add_directive(parse_directive(module, module_level)?);
        }
    }

    if let Ok(modules) = std::env::var("FORGE_LOG_MODULES") {
        for spec in modules.split(',') {
            if let Some((module, module_level)) = spec.split_once('=') {
                filter = filter.add_directive(parse_directive(module.trim(), module_level.trim())?);
            }
        }
    }
    Ok(filter)
}

fn parse_directive(
    module: &str,
    level: &str,
) -> Result<tracing_subscriber::filter::Directive, ForgeError> {
    format!("{}={}", module, level)
        .parse()
        .map_err(|e| ForgeError::ConfigError(format!("Invalid log directive '{}={}': {}", module, level, e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

fn determine_format(config: Option<&LoggingConfig>) -> Result<LogFormat, ForgeError> {
    if let Ok(format) = std::env::var("FORGE_LOG_FORMAT") {
        if let Ok(parsed) = parse_format(&format) {
            return Ok(parsed);
        }
    }
    parse_format(config.map(|c| c.format.as_str()).unwrap_or("text"))
}

fn parse_format(format: &str) -> Result<LogFormat, ForgeError> {
    match format {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(ForgeError::ConfigError(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

#[derive(Debug, PartialEq, Eq)]
struct OutputDestinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

fn determine_output(config: Option<&LoggingConfig>) -> Result<OutputDestinations, ForgeError> {
    if let Ok(output) = std::env::var("FORGE_LOG_OUTPUT") {
        return parse_output_destinations(&output);
    }
    parse_output_destinations(config.map(|c| c.output.as_str()).unwrap_or("stderr"))
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, ForgeError> {
    let (stdout, stderr, file) = match output {
        "stdout" => (true, false, false),
        "stderr" => (false, true, false),
        "file" => (false, false, true),
        "file+stderr" => (false, true, true),
        "both" => (true, true, false),
        _ => {
            return Err(ForgeError::ConfigError(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stderr', or 'both')",
                output
            )))
        }
    };
    Ok(OutputDestinations { stdout, stderr, file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, "text");
        assert_eq!(config.output, "stderr");
        assert_eq!(config.file, None);
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_parse_output_destinations() {
        let out = parse_output_destinations("file+stderr").unwrap();
        assert!(!out.stdout);
        assert!(out.stderr);
        assert!(out.file);

        let out = parse_output_destinations("both").unwrap();
        assert!(out.stdout && out.stderr && !out.file);

        assert!(parse_output_destinations("syslog").is_err());
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("json").unwrap(), LogFormat::Json);
        assert!(parse_format("yaml").is_err());
    }

    #[test]
    fn test_resolve_log_file_path_cli_wins() {
        let cli = Some(PathBuf::from("/tmp/cli.log"));
        let config = Some(PathBuf::from("/tmp/config.log"));
        let path = resolve_log_file_path(cli, config, None).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/cli.log"));
    }

    #[test]
    fn test_module_directive_must_parse() {
        assert!(parse_directive("bedrock_forge::generator", "debug").is_ok());
        assert!(parse_directive("bedrock_forge", "loud").is_err());
    }
}
