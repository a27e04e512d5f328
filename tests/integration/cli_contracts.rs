use bedrock_forge::error::ForgeError;
use bedrock_forge::tooling::cli::{CliContext, Commands};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::integration::support::{context, write, AGENT, GUARDRAIL, MODULE_REGISTRY};

fn scan_json(ctx: &CliContext, path: Option<PathBuf>) -> Value {
    let output = ctx
        .execute(&Commands::Scan {
            path,
            format: "json".to_string(),
        })
        .unwrap();
    serde_json::from_str(&output).unwrap()
}

#[test]
fn scan_json_contract_has_required_fields() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "guardrails/safety.yml", GUARDRAIL);
    write(dir.path(), "agents/support.yaml", AGENT);

    let parsed = scan_json(&context(&dir), None);
    assert_eq!(parsed["files_scanned"].as_u64(), Some(2));
    assert_eq!(parsed["total_resources"].as_u64(), Some(2));
    assert_eq!(parsed["counts"]["Agent"].as_u64(), Some(1));
    assert_eq!(parsed["counts"]["Guardrail"].as_u64(), Some(1));
    let agent = &parsed["resources"]["Agent"][0];
    assert_eq!(agent["name"], "support-agent");
    assert_eq!(agent["file"], "agents/support.yaml");
    assert_eq!(agent["document_index"].as_u64(), Some(0));
    assert!(parsed["stats"].is_object());
    assert!(parsed["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn scan_reports_parse_problems_as_warnings() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "agent.yml", AGENT);
    write(dir.path(), "bad.yml", "kind: Spaceship\nmetadata:\n  name: x\n");

    let parsed = scan_json(&context(&dir), None);
    assert_eq!(parsed["total_resources"].as_u64(), Some(1));
    let warnings = parsed["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("bad.yml"));
}

#[test]
fn scan_is_idempotent_through_the_cli() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/guardrail.yml", GUARDRAIL);
    write(dir.path(), "b/agent.yml", AGENT);

    let ctx = context(&dir);
    assert_eq!(scan_json(&ctx, None), scan_json(&ctx, None));
}

#[test]
fn scan_path_is_relative_to_workspace() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "team/agent.yml", AGENT);
    write(dir.path(), "other/guardrail.yml", GUARDRAIL);

    let parsed = scan_json(&context(&dir), Some(PathBuf::from("team")));
    assert_eq!(parsed["total_resources"].as_u64(), Some(1));
    assert_eq!(parsed["resources"]["Agent"][0]["file"], "agent.yml");
}

#[test]
fn validate_json_contract_has_required_fields() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "guardrail.yml", GUARDRAIL);
    write(dir.path(), "agent.yml", AGENT);
    write(dir.path(), "validation.yml", "enabledValidators: [naming]\n");

    let output = context(&dir)
        .execute(&Commands::Validate {
            path: None,
            format: "json".to_string(),
            profile: None,
            validation_config: None,
        })
        .unwrap();
    let parsed: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["success"], true);
    assert_eq!(parsed["total_resources"].as_u64(), Some(2));
    assert_eq!(parsed["valid_resources"].as_u64(), Some(2));
    assert!(parsed["errors"].as_array().unwrap().is_empty());
    assert!(parsed["warnings"].is_array());
    assert!(parsed["context"].is_object());
    assert!(parsed["rules"].is_object());
}

#[test]
fn generate_json_contract_has_required_fields() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "guardrail.yml", GUARDRAIL);
    write(dir.path(), "agent.yml", AGENT);

    let output = context(&dir)
        .execute(&Commands::Generate {
            path: None,
            output_dir: None,
            format: "json".to_string(),
            skip_packaging: false,
            allow_parse_errors: false,
        })
        .unwrap();
    let parsed: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["resources"].as_u64(), Some(2));
    assert!(parsed["blocks"].as_u64().unwrap() >= 2);
    let output_dir = PathBuf::from(parsed["output_dir"].as_str().unwrap());
    assert_eq!(output_dir, dir.path().join("terraform"));
    assert_eq!(parsed["files"].as_array().unwrap().len(), 1);
    assert!(parsed["packaging"].is_null());

    let main_tf = std::fs::read_to_string(output_dir.join("main.tf")).unwrap();
    assert!(main_tf.contains(MODULE_REGISTRY));
    assert!(main_tf.contains("module \"support_agent\""));
}

#[test]
fn workspace_config_file_is_layered_in() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "forge.toml",
        "[generator]\nmodule_registry = \"git::https://example.com/custom\"\noutput_dir = \"infra\"\n",
    );
    write(dir.path(), "guardrail.yml", GUARDRAIL);

    let ctx = CliContext::new(dir.path().to_path_buf(), None).unwrap();
    assert_eq!(ctx.config().generator.module_registry, "git::https://example.com/custom");

    ctx.execute(&Commands::Generate {
        path: None,
        output_dir: None,
        format: "text".to_string(),
        skip_packaging: true,
        allow_parse_errors: false,
    })
    .unwrap();
    let main_tf = std::fs::read_to_string(dir.path().join("infra").join("main.tf")).unwrap();
    assert!(main_tf.contains("git::https://example.com/custom"));
}

#[test]
fn explicit_config_file_must_exist() {
    let dir = TempDir::new().unwrap();
    let result = CliContext::new(dir.path().to_path_buf(), Some(dir.path().join("missing.toml")));
    assert!(matches!(result, Err(ForgeError::ConfigError(_))));
}
