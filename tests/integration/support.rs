use bedrock_forge::config::{ForgeConfig, GeneratorConfig};
use bedrock_forge::tooling::cli::CliContext;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const MODULE_REGISTRY: &str = "git::https://example.com/bedrock-modules";

pub const GUARDRAIL: &str = "\
kind: Guardrail
metadata:
  name: safety-rail
spec:
  blockedInputMessaging: Blocked
  blockedOutputsMessaging: Blocked
  contentPolicyConfig:
    filtersConfig:
      - { type: HATE, inputStrength: HIGH, outputStrength: HIGH }
";

pub const AGENT: &str = "\
kind: Agent
metadata:
  name: support-agent
spec:
  foundationModel: anthropic.claude-3-sonnet
  instruction: Help customers with their orders
  guardrail: { name: safety-rail }
";

pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

pub fn config() -> ForgeConfig {
    ForgeConfig {
        generator: GeneratorConfig {
            module_registry: MODULE_REGISTRY.to_string(),
            ..GeneratorConfig::default()
        },
        ..ForgeConfig::default()
    }
}

pub fn context(dir: &TempDir) -> CliContext {
    CliContext::with_config(dir.path().to_path_buf(), config())
}
