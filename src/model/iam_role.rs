//! IAMRole spec.

use super::common::{FreeForm, StringOrList, Tags};
use super::{Reference, ReferenceSite, ResourceKind, Spec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IamRoleSpec {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assume_role_policy: Option<AssumeRolePolicy>,
    #[serde(default)]
    pub policies: Vec<ManagedPolicy>,
    #[serde(default)]
    pub inline_policies: Vec<InlinePolicy>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssumeRolePolicy {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub statement: Vec<TrustStatement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TrustStatement {
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub principal: Option<FreeForm>,
    #[serde(default)]
    pub action: StringOrList,
    #[serde(default)]
    pub condition: Option<FreeForm>,
}

/// Managed policy, by ARN or by name of a local IAMRole whose policy is
/// reused.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManagedPolicy {
    #[serde(default)]
    pub policy_arn: Option<String>,
    #[serde(default)]
    pub policy_name: Reference,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InlinePolicy {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub policy: PolicyDocument,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyDocument {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub statement: Vec<PermissionStatement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PermissionStatement {
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub action: StringOrList,
    #[serde(default)]
    pub resource: StringOrList,
    #[serde(default)]
    pub condition: Option<FreeForm>,
}

impl Spec for IamRoleSpec {
    const KIND: ResourceKind = ResourceKind::IamRole;

    fn reference_sites(&self) -> Vec<ReferenceSite<'_>> {
        self.policies
            .iter()
            .enumerate()
            .map(|(i, policy)| {
                ReferenceSite::new(
                    format!("spec.policies[{}].policyName", i),
                    &policy.policy_name,
                    ResourceKind::IamRole,
                )
                .with_external("policyArn", &policy.policy_arn)
            })
            .collect()
    }

    fn check(&self) -> Result<(), String> {
        let policy = self
            .assume_role_policy
            .as_ref()
            .ok_or_else(|| "assumeRolePolicy is required".to_string())?;
        if policy.version.is_empty() {
            return Err("assumeRolePolicy.version is required".to_string());
        }
        if policy.statement.is_empty() {
            return Err("assumeRolePolicy.statement must not be empty".to_string());
        }
        for (i, inline) in self.inline_policies.iter().enumerate() {
            if inline.name.is_empty() {
                return Err(format!("inlinePolicies[{}].name is required", i));
            }
        }
        Ok(())
    }

    fn tags(&self) -> Option<&Tags> {
        Some(&self.tags)
    }
}
