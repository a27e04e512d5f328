use bedrock_forge::error::ForgeError;
use bedrock_forge::tooling::cli::{CliContext, Commands};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::integration::support::{context, write, AGENT, GUARDRAIL};

fn validate(ctx: &CliContext, path: Option<PathBuf>, profile: Option<&str>, rules: Option<PathBuf>) -> Result<Value, (usize, Value)> {
    let result = ctx.execute(&Commands::Validate {
        path,
        format: "json".to_string(),
        profile: profile.map(str::to_string),
        validation_config: rules,
    });
    match result {
        Ok(output) => Ok(serde_json::from_str(&output).unwrap()),
        Err(ForgeError::Validation { count, report }) => Err((count, serde_json::from_str(&report).unwrap())),
        Err(other) => panic!("unexpected error: {other}"),
    }
}

fn issue_kinds(report: &Value) -> Vec<String> {
    report["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn every_unresolved_reference_is_an_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "validation.yml", "enabledValidators: [naming]\n");
    write(dir.path(), "agent.yml", AGENT);
    write(
        dir.path(),
        "association.yml",
        "kind: AgentKnowledgeBaseAssociation\nmetadata:\n  name: support-docs\nspec:\n  agentName: missing-agent\n  knowledgeBaseName: missing-kb\n",
    );

    let (count, report) = validate(&context(&dir), None, None, None).unwrap_err();
    assert_eq!(count, 3);
    assert_eq!(report["success"], false);
    assert_eq!(issue_kinds(&report), vec!["dependency"; 3]);
    assert_eq!(report["valid_resources"].as_u64(), Some(0));

    let fields: Vec<&str> = report["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["resource"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"Agent/support-agent"));
    assert!(fields.contains(&"AgentKnowledgeBaseAssociation/support-docs"));
}

#[test]
fn default_profile_requires_tags() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "guardrail.yml", GUARDRAIL);
    write(dir.path(), "agent.yml", AGENT);

    let (count, report) = validate(&context(&dir), None, Some("default"), None).unwrap_err();
    assert!(count >= 3);
    assert!(issue_kinds(&report).iter().all(|k| k == "tagging_policy"));
    assert!(report["errors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["field"] == "spec.tags.Environment"));
}

#[test]
fn tagged_resources_pass_default_profile() {
    let dir = TempDir::new().unwrap();
    let tags = "  tags:\n    Environment: dev\n    Project: support\n    Owner: platform@example.com\n    CostCenter: CC-1234\n    Team: platform\n    Contact: platform@example.com\n    AgentType: support\n    BusinessFunction: customer-service\n    DataClassification: internal\n    ComplianceLevel: standard\n";
    write(dir.path(), "guardrail.yml", &format!("{}{}", GUARDRAIL, tags));
    write(dir.path(), "agent.yml", &format!("{}{}", AGENT, tags));

    let report = validate(&context(&dir), None, None, None).unwrap();
    assert_eq!(report["success"], true);
    assert_eq!(report["valid_resources"].as_u64(), Some(2));
    assert_eq!(report["rules"]["profile"], "default");
}

#[test]
fn explicit_rules_file_is_resolved_against_workspace() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "policies/strict.yml", "enabledValidators: [security]\nsecurityPolicies:\n  agentSecurity:\n    requireGuardrails: true\n");
    write(
        dir.path(),
        "defs/agent.yml",
        "kind: Agent\nmetadata:\n  name: open-agent\nspec:\n  foundationModel: m\n  instruction: Answer every question\n",
    );

    let (count, report) = validate(
        &context(&dir),
        Some(PathBuf::from("defs")),
        None,
        Some(PathBuf::from("policies/strict.yml")),
    )
    .unwrap_err();
    assert_eq!(count, 1);
    assert_eq!(issue_kinds(&report), vec!["security_policy"]);
    assert!(report["rules"]["file"].as_str().unwrap().ends_with("strict.yml"));
}

#[test]
fn parse_errors_fail_validation() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "validation.yml", "enabledValidators: [naming]\n");
    write(dir.path(), "guardrail.yml", GUARDRAIL);
    write(dir.path(), "broken.yml", "kind: Agent\nmetadata:\n  name: x\nspec:\n  unknownField: 1\n");

    let (count, report) = validate(&context(&dir), None, None, None).unwrap_err();
    assert_eq!(count, 1);
    assert_eq!(report["parse_errors"].as_array().unwrap().len(), 1);
}

#[test]
fn context_is_derived_from_directory_layout() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "team-search/prod/catalog/validation.yml", "enabledValidators: [naming]\n");
    write(dir.path(), "team-search/prod/catalog/guardrail.yml", GUARDRAIL);

    let report = validate(&context(&dir), Some(PathBuf::from("team-search/prod/catalog")), None, None).unwrap();
    assert_eq!(report["context"]["team"], "search");
    assert_eq!(report["context"]["environment"], "prod");
    assert_eq!(report["context"]["project"], "catalog");
}
