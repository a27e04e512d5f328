//! Agent projection: the agent module, its aliases and the execution role
//! synthesized when none is given.

use super::action_group::{executor_fields, schema_fields};
use super::iam_role::managed_policy;
use super::ir::{Block, Fields, Value};
use super::{invalid, module_output, sanitize_resource_name, timeouts, Generator};
use crate::error::GenerationError;
use crate::model::agent::{AgentAlias, InlineActionGroup, PromptOverride};
use crate::model::common::{is_set, non_empty};
use crate::model::{AgentSpec, Document, ResourceKind};
use tracing::debug;

const AGENT_MODULE: &str = "bedrock-agent";
const ALIAS_MODULE: &str = "bedrock-agent-alias";
const ROLE_MODULE: &str = "iam-role";
const DEFAULT_AGENT_VERSION: &str = "DRAFT";
const BEDROCK_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonBedrockFullAccess";
const POLICY_VERSION: &str = "2012-10-17";

pub(crate) fn generate(
    gen: &Generator<'_>,
    doc: &Document,
    spec: &AgentSpec,
) -> Result<Vec<Block>, GenerationError> {
    let label = sanitize_resource_name(doc.name());
    let mut block = gen.module_block(&label, AGENT_MODULE);
    let body = &mut block.body;

    body.set("name", doc.name())
        .set("foundation_model", spec.foundation_model.as_str())
        .set("instruction", spec.instruction.as_str())
        .set("agent_resource_role_arn", role_arn(gen, doc, spec)?);
    body.set_opt("description", doc.description())
        .set_opt("idle_session_ttl", spec.idle_session_ttl.filter(|ttl| *ttl > 0))
        .set_str("customer_encryption_key", &spec.customer_encryption_key)
        .set_non_empty("tags", &spec.tags);

    if let Some(guardrail) = &spec.guardrail {
        let field = "spec.guardrail.name";
        let target = gen.resolve(doc, field, &guardrail.name, ResourceKind::Guardrail)?;
        let mut fields = Fields::new();
        fields
            .set("name", guardrail.name.name())
            .set_str("version", &guardrail.version)
            .set_str("mode", &guardrail.mode)
            .set("guardrail_id", module_output(target.name(), "guardrail_id"))
            .set("guardrail_version", module_output(target.name(), "guardrail_version"));
        body.set("guardrail", fields);
    }

    if !spec.action_groups.is_empty() {
        let groups = spec
            .action_groups
            .iter()
            .enumerate()
            .map(|(i, group)| inline_action_group(gen, doc, i, group).map(Value::from))
            .collect::<Result<Vec<_>, _>>()?;
        body.set("action_groups", groups);
    }

    if !spec.prompt_overrides.is_empty() {
        let overrides = spec
            .prompt_overrides
            .iter()
            .enumerate()
            .map(|(i, entry)| prompt_override(gen, doc, i, entry).map(Value::from))
            .collect::<Result<Vec<_>, _>>()?;
        body.set("prompt_overrides", overrides);
    }

    if let Some(memory) = &spec.memory_configuration {
        let mut fields = Fields::new();
        fields
            .set_non_empty("enabled_memory_types", &memory.enabled_memory_types)
            .set_opt("storage_days", memory.storage_days.filter(|d| *d > 0));
        body.set("memory_configuration", fields);
    }

    body.set_opt("prepare_agent", spec.prepare_agent)
        .set_opt("skip_resource_in_use_check", spec.skip_resource_in_use_check);
    if let Some(fields) = spec.timeouts.as_ref().and_then(timeouts) {
        body.set("timeouts", fields);
    }

    let mut blocks = vec![block];
    for alias in &spec.aliases {
        blocks.push(alias_block(gen, doc, alias));
    }
    Ok(blocks)
}

/// Explicit ARN, then a local role, then the synthesized role.
fn role_arn(gen: &Generator<'_>, doc: &Document, spec: &AgentSpec) -> Result<Value, GenerationError> {
    if let Some(role) = &spec.iam_role {
        if let Some(arn) = non_empty(&role.role_arn) {
            return Ok(Value::from(arn));
        }
        if !role.role_name.is_empty() {
            return gen.interpolate(
                doc,
                "spec.iamRole.roleName",
                &role.role_name,
                ResourceKind::IamRole,
                "role_arn",
            );
        }
    }
    if spec.needs_auto_role() {
        return Ok(Value::interpolation(format!(
            "module.{}.role_arn",
            auto_role_label(doc.name())
        )));
    }
    Err(invalid(
        doc,
        "iamRole.autoCreate is false but neither roleArn nor roleName is set",
    ))
}

pub(crate) fn auto_role_label(agent: &str) -> String {
    format!("{}_execution_role", sanitize_resource_name(agent))
}

/// Execution role for an agent that did not name one.
pub(crate) fn auto_role(
    gen: &Generator<'_>,
    doc: &Document,
    spec: &AgentSpec,
) -> Result<Block, GenerationError> {
    let name = doc.name();
    debug!(agent = %name, "Generating execution role");
    let mut block = gen.module_block(&auto_role_label(name), ROLE_MODULE);

    let trust = Fields::new().with("version", POLICY_VERSION).with(
        "statement",
        vec![Value::from(
            Fields::new()
                .with("effect", "Allow")
                .with("principal", Fields::new().with("service", "bedrock.amazonaws.com"))
                .with("action", "sts:AssumeRole"),
        )],
    );

    let mut managed = vec![Value::from(Fields::new().with("policy_arn", BEDROCK_POLICY_ARN))];
    if let Some(role) = &spec.iam_role {
        for (i, policy) in role.additional_policies.iter().enumerate() {
            let field = format!("spec.iamRole.additionalPolicies[{}].policyName", i);
            if let Some(value) =
                managed_policy(gen, doc, &field, &policy.policy_arn, &policy.policy_name)?
            {
                managed.push(value);
            }
        }
    }

    let statement = |actions: &[&str], resource: &str| {
        Value::from(
            Fields::new()
                .with("effect", "Allow")
                .with(
                    "action",
                    actions.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
                )
                .with("resource", resource),
        )
    };
    let execution_policy = Fields::new()
        .with("name", "BedrockAgentExecutionPolicy")
        .with(
            "policy",
            Fields::new().with("version", POLICY_VERSION).with(
                "statement",
                vec![
                    statement(
                        &["bedrock:InvokeModel", "bedrock:InvokeModelWithResponseStream"],
                        "arn:aws:bedrock:*::foundation-model/*",
                    ),
                    statement(&["lambda:InvokeFunction"], "arn:aws:lambda:*:*:function:*"),
                    statement(
                        &["bedrock:Retrieve", "bedrock:RetrieveAndGenerate"],
                        "arn:aws:bedrock:*:*:knowledge-base/*",
                    ),
                    statement(
                        &["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
                        "arn:aws:logs:*:*:*",
                    ),
                ],
            ),
        );

    block
        .body
        .set("role_name", format!("{}-execution-role", name))
        .set(
            "description",
            format!("Auto-generated execution role for Bedrock agent {}", name),
        )
        .set("assume_role_policy", trust)
        .set("managed_policies", managed)
        .set("inline_policies", vec![Value::from(execution_policy)])
        .set(
            "tags",
            Fields::new()
                .with("Agent", name)
                .with("CreatedBy", super::MANAGED_BY)
                .with("Purpose", "BedrockAgentExecution"),
        );
    Ok(block)
}

fn inline_action_group(
    gen: &Generator<'_>,
    doc: &Document,
    index: usize,
    group: &InlineActionGroup,
) -> Result<Fields, GenerationError> {
    let mut fields = Fields::new();
    fields
        .set("name", group.name.as_str())
        .set_str("description", &group.description)
        .set_str("parent_action_group_signature", &group.parent_action_group_signature)
        .set_str("action_group_state", &group.action_group_state);
    if group.skip_resource_in_use_check {
        fields.set("skip_resource_in_use_check", true);
    }
    if let Some(executor) = &group.action_group_executor {
        let field = format!("spec.actionGroups[{}].actionGroupExecutor.lambda", index);
        fields.set("action_group_executor", executor_fields(gen, doc, &field, executor)?);
    }
    if let Some(schema) = &group.api_schema {
        fields.set("api_schema", schema_fields(schema, None));
    }
    if let Some(schema) = &group.function_schema {
        let functions: Vec<Value> = schema
            .functions
            .iter()
            .map(|function| {
                let mut entry = Fields::new();
                entry
                    .set("name", function.name.as_str())
                    .set_str("description", &function.description);
                if !function.parameters.is_empty() {
                    let mut params = Fields::new();
                    for (name, param) in &function.parameters {
                        let mut p = Fields::new();
                        p.set("type", param.r#type.clone().unwrap_or_else(|| "string".to_string()))
                            .set("required", param.required)
                            .set_str("description", &param.description);
                        params.set(name.as_str(), p);
                    }
                    entry.set("parameters", params);
                }
                Value::from(entry)
            })
            .collect();
        fields.set("function_schema", Fields::new().with("functions", functions));
    }
    Ok(fields)
}

fn prompt_override(
    gen: &Generator<'_>,
    doc: &Document,
    index: usize,
    entry: &PromptOverride,
) -> Result<Fields, GenerationError> {
    let field = format!("spec.promptOverrides[{}].prompt", index);
    let mut fields = Fields::new();
    fields.set_str("prompt_type", &entry.prompt_type).set_opt(
        "prompt_arn",
        gen.literal_or_interpolate(
            doc,
            &field,
            &entry.prompt_arn,
            &entry.prompt,
            ResourceKind::Prompt,
            "prompt_arn",
        )?,
    );
    let variant = if is_set(&entry.prompt_variant) {
        &entry.prompt_variant
    } else {
        &entry.variant
    };
    fields.set_str("variant", variant);
    Ok(fields)
}

fn alias_block(gen: &Generator<'_>, doc: &Document, alias: &AgentAlias) -> Block {
    let agent_label = sanitize_resource_name(doc.name());
    let label = format!("{}_{}_alias", agent_label, sanitize_resource_name(&alias.name));
    let mut block = gen.module_block(&label, ALIAS_MODULE);
    block
        .body
        .set("agent_alias_name", alias.name.as_str())
        .set("agent_id", module_output(doc.name(), "agent_id"))
        .set_str("description", &alias.description);
    if !alias.routing_configuration.is_empty() {
        let routing: Vec<Value> = alias
            .routing_configuration
            .iter()
            .map(|route| {
                let version = non_empty(&route.agent_version).unwrap_or(DEFAULT_AGENT_VERSION);
                let mut fields = Fields::new();
                fields
                    .set("agent_version", version)
                    .set_str("provisioned_throughput", &route.provisioned_throughput);
                Value::from(fields)
            })
            .collect();
        block.body.set("routing_configuration", routing);
    }
    block.body.set_non_empty("tags", &alias.tags);
    block
}
