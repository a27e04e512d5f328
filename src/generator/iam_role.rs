//! IAMRole projection.

use super::ir::{Block, Fields, Value};
use super::{sanitize_resource_name, Generator};
use crate::error::GenerationError;
use crate::model::iam_role::{AssumeRolePolicy, PolicyDocument};
use crate::model::{Document, IamRoleSpec, Reference, ResourceKind};

const ROLE_MODULE: &str = "iam-role";

pub(crate) fn generate(
    gen: &Generator<'_>,
    doc: &Document,
    spec: &IamRoleSpec,
) -> Result<Block, GenerationError> {
    let mut block = gen.module_block(&sanitize_resource_name(doc.name()), ROLE_MODULE);
    block
        .body
        .set("role_name", doc.name())
        .set_opt("description", doc.description());

    if let Some(policy) = &spec.assume_role_policy {
        block.body.set("assume_role_policy", trust_policy(policy));
    }

    if !spec.policies.is_empty() {
        let mut managed = Vec::with_capacity(spec.policies.len());
        for (i, policy) in spec.policies.iter().enumerate() {
            let field = format!("spec.policies[{}].policyName", i);
            if let Some(value) =
                managed_policy(gen, doc, &field, &policy.policy_arn, &policy.policy_name)?
            {
                managed.push(value);
            }
        }
        block.body.set_non_empty("managed_policies", managed);
    }

    if !spec.inline_policies.is_empty() {
        let inline: Vec<Value> = spec
            .inline_policies
            .iter()
            .map(|p| {
                Fields::new()
                    .with("name", p.name.as_str())
                    .with("policy", permission_policy(&p.policy))
                    .into()
            })
            .collect();
        block.body.set("inline_policies", inline);
    }

    block.body.set_non_empty("tags", &spec.tags);
    Ok(block)
}

/// One `managed_policies` entry: a literal ARN, or the role output of a
/// local IAMRole named by `policy_name`. `None` when neither is set.
pub(crate) fn managed_policy(
    gen: &Generator<'_>,
    owner: &Document,
    field: &str,
    policy_arn: &Option<String>,
    policy_name: &Reference,
) -> Result<Option<Value>, GenerationError> {
    let Some(arn) = gen.literal_or_interpolate(
        owner,
        field,
        policy_arn,
        policy_name,
        ResourceKind::IamRole,
        "role_arn",
    )?
    else {
        return Ok(None);
    };
    let mut fields = Fields::new();
    fields.set("policy_arn", arn);
    if !policy_name.is_empty() {
        fields.set("policy_name", policy_name.name());
    }
    Ok(Some(fields.into()))
}

fn trust_policy(policy: &AssumeRolePolicy) -> Fields {
    let statements: Vec<Value> = policy
        .statement
        .iter()
        .map(|stmt| {
            let mut fields = Fields::new();
            fields.set("effect", stmt.effect.as_str());
            if let Some(principal) = &stmt.principal {
                fields.set("principal", Value::from_yaml(principal));
            }
            fields.set("action", &stmt.action);
            if let Some(condition) = &stmt.condition {
                fields.set("condition", Value::from_yaml(condition));
            }
            fields.into()
        })
        .collect();
    Fields::new()
        .with("version", policy.version.as_str())
        .with("statement", statements)
}

/// Inline policies always carry `action` and `resource` as lists.
fn permission_policy(policy: &PolicyDocument) -> Fields {
    let statements: Vec<Value> = policy
        .statement
        .iter()
        .map(|stmt| {
            let mut fields = Fields::new();
            fields
                .set("effect", stmt.effect.as_str())
                .set_str("sid", &stmt.sid)
                .set_non_empty("action", stmt.action.to_vec())
                .set_non_empty("resource", stmt.resource.to_vec());
            if let Some(condition) = &stmt.condition {
                fields.set("condition", Value::from_yaml(condition));
            }
            fields.into()
        })
        .collect();
    Fields::new()
        .with("version", policy.version.as_str())
        .with("statement", statements)
}
