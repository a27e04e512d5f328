//! Agent spec.

use super::action_group::{ActionGroupExecutor, ApiSchema, FunctionSchema};
use super::common::{is_set, Tags, Timeouts};
use super::{Reference, ReferenceSite, ResourceKind, Spec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AgentSpec {
    #[serde(default)]
    pub foundation_model: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub idle_session_ttl: Option<u32>,
    #[serde(default)]
    pub customer_encryption_key: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub guardrail: Option<GuardrailBinding>,
    #[serde(default)]
    pub action_groups: Vec<InlineActionGroup>,
    #[serde(default)]
    pub prompt_overrides: Vec<PromptOverride>,
    #[serde(default)]
    pub memory_configuration: Option<MemoryConfiguration>,
    #[serde(default)]
    pub aliases: Vec<AgentAlias>,
    #[serde(default)]
    pub iam_role: Option<AgentRoleConfig>,
    #[serde(default)]
    pub prepare_agent: Option<bool>,
    #[serde(default)]
    pub skip_resource_in_use_check: Option<bool>,
    #[serde(default)]
    pub timeouts: Option<Timeouts>,
}

/// Guardrail applied to an agent. `name` is a local reference; `version`
/// and `mode` are passed through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GuardrailBinding {
    #[serde(default)]
    pub name: Reference,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// Action group declared inline on the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InlineActionGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_action_group_signature: Option<String>,
    #[serde(default)]
    pub action_group_executor: Option<ActionGroupExecutor>,
    #[serde(default)]
    pub action_group_state: Option<String>,
    #[serde(default)]
    pub api_schema: Option<ApiSchema>,
    #[serde(default)]
    pub function_schema: Option<FunctionSchema>,
    #[serde(default)]
    pub skip_resource_in_use_check: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PromptOverride {
    #[serde(default)]
    pub prompt_type: Option<String>,
    #[serde(default)]
    pub prompt_arn: Option<String>,
    #[serde(default)]
    pub prompt: Reference,
    #[serde(default)]
    pub prompt_variant: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MemoryConfiguration {
    #[serde(default)]
    pub enabled_memory_types: Vec<String>,
    #[serde(default)]
    pub storage_days: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AgentAlias {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub routing_configuration: Vec<AliasRouting>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AliasRouting {
    #[serde(default)]
    pub agent_version: Option<String>,
    #[serde(default)]
    pub provisioned_throughput: Option<String>,
}

/// Execution role selection. Either an existing role (`roleArn` or a local
/// `roleName`) or an auto-created one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AgentRoleConfig {
    #[serde(default)]
    pub auto_create: Option<bool>,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub role_name: Reference,
    #[serde(default)]
    pub additional_policies: Vec<PolicyAttachment>,
}

/// Managed policy attached to a role, by ARN or by a local IAMRole name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyAttachment {
    #[serde(default)]
    pub policy_arn: Option<String>,
    #[serde(default)]
    pub policy_name: Reference,
}

impl AgentSpec {
    /// Whether generation must synthesize an execution role for this agent.
    ///
    /// An explicit `roleArn` or `roleName` always wins; otherwise a role is
    /// created unless `autoCreate: false` was given.
    pub fn needs_auto_role(&self) -> bool {
        match &self.iam_role {
            None => true,
            Some(role) => {
                if is_set(&role.role_arn) || !role.role_name.is_empty() {
                    return false;
                }
                role.auto_create.unwrap_or(true)
            }
        }
    }
}

impl Spec for AgentSpec {
    const KIND: ResourceKind = ResourceKind::Agent;

    fn reference_sites(&self) -> Vec<ReferenceSite<'_>> {
        let mut sites = Vec::new();
        if let Some(guardrail) = &self.guardrail {
            sites.push(ReferenceSite::new(
                "spec.guardrail.name",
                &guardrail.name,
                ResourceKind::Guardrail,
            ));
        }
        for (i, group) in self.action_groups.iter().enumerate() {
            if let Some(executor) = &group.action_group_executor {
                sites.push(
                    ReferenceSite::new(
                        format!("spec.actionGroups[{}].actionGroupExecutor.lambda", i),
                        &executor.lambda,
                        ResourceKind::Lambda,
                    )
                    .with_external("lambdaArn", &executor.lambda_arn),
                );
            }
        }
        for (i, entry) in self.prompt_overrides.iter().enumerate() {
            sites.push(
                ReferenceSite::new(
                    format!("spec.promptOverrides[{}].prompt", i),
                    &entry.prompt,
                    ResourceKind::Prompt,
                )
                .with_external("promptArn", &entry.prompt_arn),
            );
        }
        if let Some(role) = &self.iam_role {
            sites.push(
                ReferenceSite::new("spec.iamRole.roleName", &role.role_name, ResourceKind::IamRole)
                    .with_external("roleArn", &role.role_arn),
            );
            for (i, policy) in role.additional_policies.iter().enumerate() {
                sites.push(
                    ReferenceSite::new(
                        format!("spec.iamRole.additionalPolicies[{}].policyName", i),
                        &policy.policy_name,
                        ResourceKind::IamRole,
                    )
                    .with_external("policyArn", &policy.policy_arn),
                );
            }
        }
        sites
    }

    fn check(&self) -> Result<(), String> {
        if self.foundation_model.is_empty() {
            return Err("foundationModel is required".to_string());
        }
        if self.instruction.is_empty() {
            return Err("instruction is required".to_string());
        }
        for (i, group) in self.action_groups.iter().enumerate() {
            if group.name.is_empty() {
                return Err(format!("actionGroups[{}].name is required", i));
            }
        }
        for (i, alias) in self.aliases.iter().enumerate() {
            if alias.name.is_empty() {
                return Err(format!("aliases[{}].name is required", i));
            }
        }
        Ok(())
    }

    fn tags(&self) -> Option<&Tags> {
        Some(&self.tags)
    }
}
