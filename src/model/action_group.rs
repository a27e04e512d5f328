//! ActionGroup spec: binds an agent to the executor that serves its actions.

use super::common::{is_set, Tags, Timeouts};
use super::{Reference, ReferenceSite, ResourceKind, Spec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActionGroupSpec {
    #[serde(default)]
    pub agent_id: Reference,
    #[serde(default)]
    pub agent_version: Option<String>,
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
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub prepare_agent: Option<bool>,
    #[serde(default)]
    pub timeouts: Option<Timeouts>,
}

/// Executor behind an action group: a local Lambda, an external ARN, or a
/// custom control mode such as `RETURN_CONTROL`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActionGroupExecutor {
    #[serde(default)]
    pub lambda: Reference,
    #[serde(default)]
    pub lambda_arn: Option<String>,
    #[serde(default)]
    pub custom_control: Option<String>,
}

impl ActionGroupExecutor {
    pub fn is_configured(&self) -> bool {
        !self.lambda.is_empty() || is_set(&self.lambda_arn) || is_set(&self.custom_control)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiSchema {
    #[serde(default)]
    pub s3: Option<S3Location>,
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct S3Location {
    #[serde(default)]
    pub s3_bucket_name: Option<String>,
    #[serde(default)]
    pub s3_object_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FunctionSchema {
    #[serde(default)]
    pub functions: Vec<FunctionDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FunctionDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, FunctionParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FunctionParameter {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type")]
    pub r#type: Option<String>,
}

impl Spec for ActionGroupSpec {
    const KIND: ResourceKind = ResourceKind::ActionGroup;

    fn reference_sites(&self) -> Vec<ReferenceSite<'_>> {
        let mut sites = vec![ReferenceSite::new(
            "spec.agentId",
            &self.agent_id,
            ResourceKind::Agent,
        )];
        if let Some(executor) = &self.action_group_executor {
            sites.push(
                ReferenceSite::new(
                    "spec.actionGroupExecutor.lambda",
                    &executor.lambda,
                    ResourceKind::Lambda,
                )
                .with_external("lambdaArn", &executor.lambda_arn),
            );
        }
        sites
    }

    fn check(&self) -> Result<(), String> {
        if self.agent_id.is_empty() {
            return Err("agentId is required".to_string());
        }
        match &self.action_group_executor {
            Some(executor) if executor.is_configured() => {}
            _ => return Err("actionGroupExecutor is required".to_string()),
        }
        if let Some(schema) = &self.function_schema {
            for (i, function) in schema.functions.iter().enumerate() {
                if function.name.is_empty() {
                    return Err(format!("functionSchema.functions[{}].name is required", i));
                }
            }
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
    fn test_external_arn_executor_is_configured() {
        let yaml = r#"
agentId: support
actionGroupExecutor:
  lambdaArn: arn:aws:lambda:us-east-1:123456789012:function:external
"#;
        let spec: ActionGroupSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.check().is_ok());
        let sites = spec.reference_sites();
        assert_eq!(sites.len(), 2);
        assert!(sites[1].reference.is_empty());
        assert_eq!(sites[1].external.unwrap().field, "lambdaArn");
    }

    #[test]
    fn test_missing_executor_fails_check() {
        let spec: ActionGroupSpec = serde_yaml::from_str("agentId: a\n").unwrap();
        assert_eq!(spec.check().unwrap_err(), "actionGroupExecutor is required");
    }

    #[test]
    fn test_function_parameters_decode() {
        let yaml = r#"
agentId: a
actionGroupExecutor: { customControl: RETURN_CONTROL }
functionSchema:
  functions:
    - name: lookup
      parameters:
        order_id: { type: string, required: true, description: Order id }
"#;
        let spec: ActionGroupSpec = serde_yaml::from_str(yaml).unwrap();
        let functions = &spec.function_schema.unwrap().functions;
        let param = &functions[0].parameters["order_id"];
        assert!(param.required);
        assert_eq!(param.r#type.as_deref(), Some("string"));
    }
}
