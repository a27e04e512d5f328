use bedrock_forge::config::ForgeConfig;
use bedrock_forge::error::{ForgeError, GenerationError};
use bedrock_forge::pipeline::{GenerateOptions, Pipeline};
use bedrock_forge::tooling::cli::{CliContext, Commands};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::integration::support::{config, context, write, AGENT, GUARDRAIL};

const LAMBDA: &str = "\
kind: Lambda
metadata:
  name: orders-fn
spec:
  runtime: python3.11
  handler: app.handler
  code:
    source: directory
";

const ACTION_GROUP: &str = "\
kind: ActionGroup
metadata:
  name: orders-api
spec:
  agentId: support-agent
  actionGroupExecutor:
    lambda: orders-fn
  apiSchema: {}
";

fn generate(root: &Path, config: ForgeConfig, out: &str, options: GenerateOptions) -> Result<String, ForgeError> {
    let pipeline = Pipeline::new(config, root);
    let outcome = pipeline.generate(root, Some(&root.join(out)), options)?;
    Ok(fs::read_to_string(outcome.files.output_dir.join("main.tf")).unwrap())
}

fn skip_packaging() -> GenerateOptions {
    GenerateOptions {
        skip_packaging: true,
        ..GenerateOptions::default()
    }
}

#[test]
fn generation_is_byte_identical_across_runs() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "guardrails/safety.yml", GUARDRAIL);
    write(dir.path(), "agents/support.yml", AGENT);
    write(
        dir.path(),
        "agents/billing.yml",
        "kind: Agent\nmetadata:\n  name: billing-agent\nspec:\n  foundationModel: m\n  instruction: Answer billing questions\n",
    );

    let first = generate(dir.path(), config(), "out-a", skip_packaging()).unwrap();
    let second = generate(dir.path(), config(), "out-b", skip_packaging()).unwrap();
    assert_eq!(first, second);
    assert!(first.find("module \"safety_rail\"").unwrap() < first.find("module \"support_agent\"").unwrap());
}

#[test]
fn packaged_artifacts_replace_declared_locations() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "agents/support.yml", AGENT);
    write(dir.path(), "guardrails/safety.yml", GUARDRAIL);
    write(dir.path(), "lambdas/orders/lambda.yml", LAMBDA);
    write(dir.path(), "lambdas/orders/app.py", "def handler(event, context):\n    return {}\n");
    write(dir.path(), "action-groups/orders/action-group.yml", ACTION_GROUP);
    write(dir.path(), "action-groups/orders/openapi.json", "{\"openapi\": \"3.0.0\"}\n");

    let mut config = config();
    config.packaging.enabled = true;
    config.packaging.bucket = "artifacts".to_string();

    let first = generate(dir.path(), config.clone(), "out-a", GenerateOptions::default()).unwrap();
    assert!(first.contains("\"artifacts\""));
    assert!(first.contains("bedrock-forge/lambdas/orders-fn/"));
    assert!(first.contains("bedrock-forge/schemas/orders-api/openapi.json"));

    // Same sources, same archive hash, same output.
    let second = generate(dir.path(), config, "out-b", GenerateOptions::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn packaging_summary_is_reported() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "lambdas/orders/lambda.yml", LAMBDA);
    write(dir.path(), "lambdas/orders/app.py", "def handler(event, context):\n    return {}\n");

    let mut config = config();
    config.packaging.enabled = true;
    config.packaging.bucket = "artifacts".to_string();
    let output = CliContext::with_config(dir.path().to_path_buf(), config)
        .execute(&Commands::Generate {
            path: None,
            output_dir: None,
            format: "json".to_string(),
            skip_packaging: false,
            allow_parse_errors: false,
        })
        .unwrap();
    let parsed: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["packaging"]["lambdas"].as_u64(), Some(1));
    assert!(parsed["packaging"]["errors"].as_array().unwrap().is_empty());
}

#[test]
fn external_lambda_arn_bypasses_resolution() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "agent.yml", AGENT);
    write(dir.path(), "guardrail.yml", GUARDRAIL);
    write(
        dir.path(),
        "action-group.yml",
        "kind: ActionGroup\nmetadata:\n  name: lookup\nspec:\n  agentId: support-agent\n  actionGroupExecutor:\n    lambdaArn: arn:aws:lambda:us-east-1:123456789012:function:lookup\n  apiSchema:\n    s3:\n      s3BucketName: schemas\n      s3ObjectKey: lookup.json\n",
    );

    let main_tf = generate(dir.path(), config(), "out", skip_packaging()).unwrap();
    assert!(main_tf.contains("arn:aws:lambda:us-east-1:123456789012:function:lookup"));
}

#[test]
fn malformed_document_blocks_generation_unless_allowed() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "bundle.yml",
        &format!("{}---\nkind: Agent\nmetadata: [broken\n---\n{}", GUARDRAIL, AGENT),
    );

    let err = generate(dir.path(), config(), "out", skip_packaging()).unwrap_err();
    assert!(matches!(err, ForgeError::Parse { count: 1, .. }));

    let options = GenerateOptions {
        skip_packaging: true,
        allow_parse_errors: true,
    };
    let main_tf = generate(dir.path(), config(), "out", options).unwrap();
    assert!(main_tf.contains("module \"safety_rail\""));
    assert!(main_tf.contains("module \"support_agent\""));
}

#[test]
fn unresolved_references_are_all_reported() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "agent.yml", AGENT);
    write(
        dir.path(),
        "association.yml",
        "kind: AgentKnowledgeBaseAssociation\nmetadata:\n  name: support-docs\nspec:\n  agentName: missing-agent\n  knowledgeBaseName: missing-kb\n  description: Product docs\n",
    );

    let err = generate(dir.path(), config(), "out", skip_packaging()).unwrap_err();
    match err {
        ForgeError::Dependency { count, errors } => {
            assert_eq!(count, 3);
            assert_eq!(errors.len(), 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("out").exists());
}

#[test]
fn duplicate_definitions_block_generation() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.yml", GUARDRAIL);
    write(dir.path(), "b.yml", GUARDRAIL);

    let err = generate(dir.path(), config(), "out", skip_packaging()).unwrap_err();
    assert!(matches!(err, ForgeError::Duplicate { count: 1, .. }));
}

#[test]
fn missing_module_registry_is_fatal() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "guardrail.yml", GUARDRAIL);

    let mut config = config();
    config.generator.module_registry = String::new();
    let err = generate(dir.path(), config, "out", skip_packaging()).unwrap_err();
    assert!(matches!(
        err,
        ForgeError::Generation(GenerationError::MissingModuleRegistry)
    ));
}

#[test]
fn text_output_lists_written_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "guardrail.yml", GUARDRAIL);

    let output = context(&dir)
        .execute(&Commands::Generate {
            path: None,
            output_dir: None,
            format: "text".to_string(),
            skip_packaging: true,
            allow_parse_errors: false,
        })
        .unwrap();
    assert!(output.contains("main.tf"));
}
