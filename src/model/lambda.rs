//! Lambda function spec.

use super::common::{FreeForm, StringOrList, Tags, Timeouts};
use super::{Reference, ReferenceSite, ResourceKind, Spec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `code.source` value that asks the packager to bundle the directory that
/// holds the Lambda's YAML file.
pub const DIRECTORY_SOURCE: &str = "directory";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LambdaSpec {
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub handler: String,
    #[serde(default)]
    pub code: LambdaCode,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub timeout: Option<u32>,
    #[serde(default)]
    pub memory_size: Option<u32>,
    #[serde(default)]
    pub reserved_concurrency: Option<i32>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub vpc_config: Option<VpcConfig>,
    #[serde(default)]
    pub resource_policy: Option<ResourcePolicy>,
    #[serde(default)]
    pub role: Reference,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub architectures: Vec<String>,
    #[serde(default)]
    pub code_signing_config_arn: Option<String>,
    #[serde(default)]
    pub dead_letter_config: Option<DeadLetterConfig>,
    #[serde(default)]
    pub ephemeral_storage: Option<EphemeralStorage>,
    #[serde(default)]
    pub file_system_config: Option<FileSystemConfig>,
    #[serde(default)]
    pub image_config: Option<ImageConfig>,
    #[serde(default)]
    pub kms_key_arn: Option<String>,
    #[serde(default)]
    pub layers: Vec<String>,
    #[serde(default)]
    pub package_type: Option<String>,
    #[serde(default)]
    pub publish: Option<bool>,
    #[serde(default)]
    pub replace_security_groups_on_destroy: Option<bool>,
    #[serde(default)]
    pub replacement_security_group_ids: Vec<String>,
    #[serde(default)]
    pub skip_destroy: Option<bool>,
    #[serde(default)]
    pub snap_start: Option<SnapStart>,
    #[serde(default)]
    pub source_code_hash: Option<String>,
    #[serde(default)]
    pub timeouts: Option<Timeouts>,
    #[serde(default)]
    pub tracing_config: Option<TracingConfig>,
}

impl LambdaSpec {
    pub fn is_directory_source(&self) -> bool {
        self.code.source == DIRECTORY_SOURCE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LambdaCode {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub zip_file: Option<String>,
    #[serde(default)]
    pub s3_bucket: Option<String>,
    #[serde(default)]
    pub s3_key: Option<String>,
    #[serde(default)]
    pub s3_object_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VpcConfig {
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
}

/// Resource-based policy on the function. `allowBedrockAgents` grants
/// invoke permission to the agents that use this function as an executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourcePolicy {
    #[serde(default)]
    pub allow_bedrock_agents: bool,
    #[serde(default)]
    pub statements: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyStatement {
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub effect: Option<String>,
    #[serde(default)]
    pub principal: Option<FreeForm>,
    #[serde(default)]
    pub action: StringOrList,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub condition: Option<FreeForm>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeadLetterConfig {
    #[serde(default)]
    pub target_arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EphemeralStorage {
    #[serde(default)]
    pub size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileSystemConfig {
    #[serde(default)]
    pub arn: String,
    #[serde(default)]
    pub local_mount_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageConfig {
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub entry_point: Vec<String>,
    #[serde(default)]
    pub working_directory: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SnapStart {
    #[serde(default)]
    pub apply_on: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TracingConfig {
    #[serde(default)]
    pub mode: String,
}

impl Spec for LambdaSpec {
    const KIND: ResourceKind = ResourceKind::Lambda;

    fn reference_sites(&self) -> Vec<ReferenceSite<'_>> {
        vec![ReferenceSite::new("spec.role", &self.role, ResourceKind::IamRole)
            .with_external("roleArn", &self.role_arn)]
    }

    fn check(&self) -> Result<(), String> {
        if self.runtime.is_empty() {
            return Err("runtime is required".to_string());
        }
        if self.handler.is_empty() {
            return Err("handler is required".to_string());
        }
        if self.code.source.is_empty() {
            return Err("code.source is required".to_string());
        }
        Ok(())
    }

    fn tags(&self) -> Option<&Tags> {
        Some(&self.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_directory_lambda() {
        let yaml = r#"
runtime: python3.11
handler: app.handler
code:
  source: directory
environment:
  TABLE: orders
resourcePolicy:
  allowBedrockAgents: true
  statements:
    - sid: AllowAccount
      effect: Allow
      principal: { AWS: "arn:aws:iam::123456789012:root" }
      action: lambda:InvokeFunction
"#;
        let spec: LambdaSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.is_directory_source());
        assert!(spec.check().is_ok());
        let policy = spec.resource_policy.unwrap();
        assert!(policy.allow_bedrock_agents);
        assert_eq!(
            policy.statements[0].action.to_vec(),
            vec!["lambda:InvokeFunction".to_string()]
        );
    }

    #[test]
    fn test_missing_code_source_fails_check() {
        let spec: LambdaSpec =
            serde_yaml::from_str("runtime: python3.11\nhandler: app.handler\n").unwrap();
        assert_eq!(spec.check().unwrap_err(), "code.source is required");
    }
}
