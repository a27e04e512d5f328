//! Lambda projection, including packaged-code substitution and the invoke
//! permissions granted to agents that call the function.

use super::ir::{Block, Fields, Value};
use super::{sanitize_resource_name, timeouts, Generator};
use crate::error::GenerationError;
use crate::model::lambda::{LambdaCode, PolicyStatement};
use crate::model::{Document, FreeForm, LambdaSpec, ResourceKind, ResourceSpec};
use std::collections::BTreeSet;
use tracing::warn;

const LAMBDA_MODULE: &str = "lambda-function";
const BEDROCK_SERVICE: &str = "bedrock.amazonaws.com";
const INVOKE_ACTION: &str = "lambda:InvokeFunction";

pub(crate) fn generate(
    gen: &Generator<'_>,
    doc: &Document,
    spec: &LambdaSpec,
) -> Result<Block, GenerationError> {
    let name = doc.name();
    let mut block = gen.module_block(&sanitize_resource_name(name), LAMBDA_MODULE);
    let body = &mut block.body;
    body.set("function_name", name)
        .set("runtime", spec.runtime.as_str())
        .set("handler", spec.handler.as_str())
        .set_opt("description", doc.description());

    let mut source_code_hash = spec.source_code_hash.clone();
    match gen.context().lambda_package(name) {
        Some(package) => {
            body.set(
                "code",
                Fields::new()
                    .with("source", "s3")
                    .with("s3_bucket", package.bucket.as_str())
                    .with("s3_key", package.key.as_str()),
            );
            source_code_hash = Some(package.hash.clone());
        }
        None => {
            if spec.is_directory_source() {
                let reason = gen
                    .context()
                    .failure(name)
                    .unwrap_or("function was not packaged")
                    .to_string();
                if gen.artifacts_required() {
                    return Err(GenerationError::MissingArtifact {
                        kind: ResourceKind::Lambda,
                        name: name.to_string(),
                        message: reason,
                    });
                }
                warn!(lambda = %name, reason = %reason, "Keeping declared code for unpackaged Lambda");
            }
            body.set("code", declared_code(&spec.code));
        }
    }

    body.set_non_empty("environment_variables", &spec.environment)
        .set_opt("timeout", spec.timeout.filter(|t| *t > 0))
        .set_opt("memory_size", spec.memory_size.filter(|m| *m > 0))
        .set_opt("reserved_concurrency", spec.reserved_concurrency.filter(|c| *c > 0))
        .set_non_empty("tags", &spec.tags);

    if let Some(vpc) = &spec.vpc_config {
        let mut fields = Fields::new();
        fields
            .set_non_empty("security_group_ids", &vpc.security_group_ids)
            .set_non_empty("subnet_ids", &vpc.subnet_ids);
        body.set_non_empty("vpc_config", fields);
    }

    match gen.literal_or_interpolate(
        doc,
        "spec.role",
        &spec.role_arn,
        &spec.role,
        ResourceKind::IamRole,
        "role_arn",
    )? {
        Some(role_arn) => {
            body.set("role_arn", role_arn).set("create_role", false);
        }
        None => {
            body.set("create_role", true);
        }
    }

    body.set_non_empty("lambda_resource_policy_statements", policy_statements(gen, doc, spec));

    body.set_non_empty("architectures", &spec.architectures)
        .set_str("code_signing_config_arn", &spec.code_signing_config_arn)
        .set_str("kms_key_arn", &spec.kms_key_arn)
        .set_non_empty("layers", &spec.layers)
        .set_str("package_type", &spec.package_type)
        .set_opt("publish", spec.publish)
        .set_opt(
            "replace_security_groups_on_destroy",
            spec.replace_security_groups_on_destroy,
        )
        .set_non_empty(
            "replacement_security_group_ids",
            &spec.replacement_security_group_ids,
        )
        .set_opt("skip_destroy", spec.skip_destroy)
        .set_str("source_code_hash", &source_code_hash);

    if let Some(dlq) = &spec.dead_letter_config {
        body.set(
            "dead_letter_config",
            Fields::new().with("target_arn", dlq.target_arn.as_str()),
        );
    }
    if let Some(storage) = &spec.ephemeral_storage {
        body.set("ephemeral_storage", Fields::new().with("size", storage.size));
    }
    if let Some(fs) = &spec.file_system_config {
        body.set(
            "file_system_config",
            Fields::new()
                .with("arn", fs.arn.as_str())
                .with("local_mount_path", fs.local_mount_path.as_str()),
        );
    }
    if let Some(image) = &spec.image_config {
        let mut fields = Fields::new();
        fields
            .set_non_empty("command", &image.command)
            .set_non_empty("entry_point", &image.entry_point)
            .set_str("working_directory", &image.working_directory);
        body.set("image_config", fields);
    }
    if let Some(snap) = &spec.snap_start {
        body.set("snap_start", Fields::new().with("apply_on", snap.apply_on.as_str()));
    }
    if let Some(fields) = spec.timeouts.as_ref().and_then(timeouts) {
        body.set("timeouts", fields);
    }
    if let Some(tracing) = &spec.tracing_config {
        body.set("tracing_config", Fields::new().with("mode", tracing.mode.as_str()));
    }

    Ok(block)
}

fn declared_code(code: &LambdaCode) -> Fields {
    let mut fields = Fields::new();
    fields
        .set("source", code.source.as_str())
        .set_str("zip_file", &code.zip_file)
        .set_str("s3_bucket", &code.s3_bucket)
        .set_str("s3_key", &code.s3_key)
        .set_str("s3_object_version", &code.s3_object_version);
    fields
}

/// Declared statements, then one scoped statement per calling agent. With
/// no calling agent a generic Bedrock invoke statement is added unless
/// `allowBedrockAgents` is false.
fn policy_statements(gen: &Generator<'_>, doc: &Document, spec: &LambdaSpec) -> Vec<Value> {
    let mut statements: Vec<Value> = spec
        .resource_policy
        .iter()
        .flat_map(|policy| policy.statements.iter())
        .map(declared_statement)
        .collect();

    let agents = calling_agents(gen, doc.name());
    if agents.is_empty() {
        let allowed = spec
            .resource_policy
            .as_ref()
            .map(|p| p.allow_bedrock_agents)
            .unwrap_or(true);
        if allowed {
            statements.push(bedrock_statement("AllowBedrockAgentInvoke").into());
        }
    }
    for agent in agents {
        let label = sanitize_resource_name(&agent);
        let mut statement = bedrock_statement(&format!("AllowBedrockAgent_{}", label));
        statement.set(
            "condition",
            Fields::new().with(
                "StringEquals",
                Fields::new().with(
                    "aws:SourceArn",
                    Value::interpolation(format!("module.{}.agent_arn", label)),
                ),
            ),
        );
        statements.push(statement.into());
    }
    statements
}

fn bedrock_statement(sid: &str) -> Fields {
    Fields::new()
        .with("sid", sid)
        .with("effect", "Allow")
        .with(
            "principals",
            vec![Value::from(
                Fields::new()
                    .with("type", "Service")
                    .with("identifiers", vec![BEDROCK_SERVICE.to_string()]),
            )],
        )
        .with("actions", vec![INVOKE_ACTION.to_string()])
}

fn declared_statement(stmt: &PolicyStatement) -> Value {
    let mut fields = Fields::new();
    fields
        .set_str("sid", &stmt.sid)
        .set("effect", stmt.effect.as_deref().unwrap_or("Allow"));
    if let Some(principal) = &stmt.principal {
        fields.set_non_empty("principals", principals(principal));
    }
    fields
        .set_non_empty("actions", stmt.action.to_vec())
        .set_str("resource", &stmt.resource);
    if let Some(condition) = &stmt.condition {
        fields.set("condition", Value::from_yaml(condition));
    }
    fields.into()
}

/// `{Service: x}` or `{AWS: [a, b]}` into `[{type, identifiers}]`.
fn principals(principal: &FreeForm) -> Vec<Value> {
    let Some(map) = principal.as_mapping() else {
        if let Some(all) = principal.as_str() {
            return vec![Fields::new()
                .with("type", "*")
                .with("identifiers", vec![all.to_string()])
                .into()];
        }
        return Vec::new();
    };
    map.iter()
        .filter_map(|(kind, ids)| {
            let kind = kind.as_str()?;
            let identifiers: Vec<String> = match ids {
                FreeForm::String(s) => vec![s.clone()],
                FreeForm::Sequence(items) => items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect(),
                _ => return None,
            };
            Some(
                Fields::new()
                    .with("type", kind)
                    .with("identifiers", identifiers)
                    .into(),
            )
        })
        .collect()
}

/// Agents whose action groups execute through `lambda`, inline or via an
/// ActionGroup document. Sorted and unique.
fn calling_agents(gen: &Generator<'_>, lambda: &str) -> BTreeSet<String> {
    let registry = gen.registry();
    let mut agents = BTreeSet::new();
    for doc in registry.get_resources_by_kind(ResourceKind::Agent).values() {
        if let ResourceSpec::Agent(spec) = &doc.spec {
            let calls = spec.action_groups.iter().any(|group| {
                group
                    .action_group_executor
                    .as_ref()
                    .is_some_and(|e| e.lambda.name() == lambda)
            });
            if calls {
                agents.insert(doc.name().to_string());
            }
        }
    }
    for doc in registry.get_resources_by_kind(ResourceKind::ActionGroup).values() {
        if let ResourceSpec::ActionGroup(spec) = &doc.spec {
            let calls = spec
                .action_group_executor
                .as_ref()
                .is_some_and(|e| e.lambda.name() == lambda);
            if calls {
                if let Some(agent) = registry.resolve(&spec.agent_id, ResourceKind::Agent) {
                    agents.insert(agent.name().to_string());
                }
            }
        }
    }
    agents
}
