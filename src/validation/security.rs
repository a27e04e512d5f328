//! Security policies for IAM roles, Lambdas, agents and knowledge bases.

use super::{IssueKind, ValidationIssue};
use crate::error::ForgeError;
use crate::generator::ir::yaml_key;
use crate::model::iam_role::PermissionStatement;
use crate::model::{AgentSpec, Document, FreeForm, IamRoleSpec, KnowledgeBaseSpec, LambdaSpec, ResourceSpec};
use regex::Regex;
use serde::{Deserialize, Serialize};

const MFA_CONDITION_KEYS: [&str; 2] = ["aws:MultiFactorAuthPresent", "aws:MultiFactorAuthAge"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPolicyConfig {
    #[serde(default)]
    pub iam_policies: Option<IamPolicyRules>,
    #[serde(default)]
    pub lambda_security: Option<LambdaSecurityRules>,
    #[serde(default)]
    pub agent_security: Option<AgentSecurityRules>,
    #[serde(default)]
    pub knowledge_base_security: Option<KnowledgeBaseSecurityRules>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamPolicyRules {
    /// Regexes matched against each action.
    #[serde(default)]
    pub forbidden_actions: Vec<String>,
    #[serde(default)]
    pub allow_wildcard_resources: bool,
    #[serde(default)]
    pub allow_admin_permissions: bool,
    #[serde(default, rename = "requireMFAForSensitiveActions")]
    pub require_mfa_for_sensitive_actions: bool,
    #[serde(default)]
    pub sensitive_actions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaSecurityRules {
    #[serde(default, rename = "requireVPC")]
    pub require_vpc: bool,
    /// Regexes matched against environment variable names and values.
    #[serde(default)]
    pub forbidden_env_patterns: Vec<String>,
    #[serde(default)]
    pub max_timeout: Option<u32>,
    #[serde(default)]
    pub max_memory_size: Option<u32>,
    #[serde(default)]
    pub allowed_runtimes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSecurityRules {
    #[serde(default)]
    pub require_guardrails: bool,
    #[serde(default, rename = "maxIdleSessionTTL")]
    pub max_idle_session_ttl: Option<u32>,
    #[serde(default)]
    pub require_customer_encryption: bool,
    /// Substrings that may not appear in the foundation model id.
    #[serde(default)]
    pub forbidden_models: Vec<String>,
    #[serde(default)]
    pub require_memory_configuration: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseSecurityRules {
    #[serde(default)]
    pub allowed_data_source_types: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl SecurityPolicyConfig {
    pub fn default_profile() -> Self {
        Self {
            iam_policies: Some(IamPolicyRules {
                forbidden_actions: strings(&["iam:CreateAccessKey", "iam:DeleteAccessKey", "sts:AssumeRole.*Root"]),
                allow_wildcard_resources: true,
                allow_admin_permissions: false,
                require_mfa_for_sensitive_actions: false,
                sensitive_actions: strings(&["iam:.*", "sts:AssumeRole", "kms:.*"]),
            }),
            lambda_security: Some(LambdaSecurityRules {
                require_vpc: false,
                forbidden_env_patterns: strings(&["(?i)(password|secret|key|token)"]),
                max_timeout: Some(900),
                max_memory_size: Some(3008),
                allowed_runtimes: strings(&[
                    "python3.11",
                    "python3.10",
                    "python3.9",
                    "nodejs18.x",
                    "nodejs16.x",
                    "java17",
                    "java11",
                    "dotnet6",
                ]),
            }),
            agent_security: Some(AgentSecurityRules {
                max_idle_session_ttl: Some(3600),
                ..AgentSecurityRules::default()
            }),
            knowledge_base_security: Some(KnowledgeBaseSecurityRules {
                allowed_data_source_types: strings(&["S3", "Web", "Confluence", "SharePoint"]),
            }),
        }
    }

    pub fn enterprise() -> Self {
        Self {
            iam_policies: Some(IamPolicyRules {
                forbidden_actions: strings(&[
                    "iam:CreateAccessKey",
                    "iam:DeleteAccessKey",
                    "iam:CreateUser",
                    "iam:DeleteUser",
                    "sts:AssumeRole.*Root",
                    ".*:.*Admin.*",
                    ".*:.*Full.*",
                ]),
                allow_wildcard_resources: false,
                allow_admin_permissions: false,
                require_mfa_for_sensitive_actions: true,
                sensitive_actions: strings(&[
                    "iam:.*",
                    "sts:AssumeRole",
                    "kms:.*",
                    "secretsmanager:.*",
                    "bedrock:.*Agent.*",
                ]),
            }),
            lambda_security: Some(LambdaSecurityRules {
                require_vpc: true,
                forbidden_env_patterns: strings(&[
                    "(?i)(password|secret|key|token|api_key|auth)",
                    "(?i)(prod|production).*(pass|secret)",
                ]),
                max_timeout: Some(300),
                max_memory_size: Some(1024),
                allowed_runtimes: strings(&["python3.11", "python3.10", "nodejs18.x", "java17"]),
            }),
            agent_security: Some(AgentSecurityRules {
                require_guardrails: true,
                max_idle_session_ttl: Some(1800),
                require_customer_encryption: true,
                forbidden_models: strings(&["anthropic.claude-instant", "meta.llama2"]),
                require_memory_configuration: true,
            }),
            knowledge_base_security: Some(KnowledgeBaseSecurityRules {
                allowed_data_source_types: strings(&["S3"]),
            }),
        }
    }
}

fn compile_all(label: &str, patterns: &[String]) -> Result<Vec<(String, Regex)>, ForgeError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern)
                .map(|regex| (pattern.clone(), regex))
                .map_err(|e| {
                    ForgeError::ConfigError(format!("Invalid {} pattern '{}': {}", label, pattern, e))
                })
        })
        .collect()
}

pub struct SecurityValidator {
    config: SecurityPolicyConfig,
    forbidden_actions: Vec<(String, Regex)>,
    sensitive_actions: Vec<(String, Regex)>,
    forbidden_env: Vec<(String, Regex)>,
}

impl SecurityValidator {
    pub fn new(config: SecurityPolicyConfig) -> Result<Self, ForgeError> {
        let (forbidden_actions, sensitive_actions) = match &config.iam_policies {
            Some(iam) => (
                compile_all("forbidden action", &iam.forbidden_actions)?,
                compile_all("sensitive action", &iam.sensitive_actions)?,
            ),
            None => (Vec::new(), Vec::new()),
        };
        let forbidden_env = match &config.lambda_security {
            Some(lambda) => compile_all("environment", &lambda.forbidden_env_patterns)?,
            None => Vec::new(),
        };
        Ok(Self {
            config,
            forbidden_actions,
            sensitive_actions,
            forbidden_env,
        })
    }

    pub fn validate(&self, document: &Document) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut report = |field: String, message: String| {
            issues.push(ValidationIssue::new(IssueKind::SecurityPolicy, document, field, message));
        };
        match &document.spec {
            ResourceSpec::IamRole(spec) => self.check_role(spec, &mut report),
            ResourceSpec::Lambda(spec) => self.check_lambda(spec, &mut report),
            ResourceSpec::Agent(spec) => self.check_agent(spec, &mut report),
            ResourceSpec::KnowledgeBase(spec) => self.check_knowledge_base(spec, &mut report),
            _ => {}
        }
        issues
    }

    fn check_role(&self, spec: &IamRoleSpec, report: &mut impl FnMut(String, String)) {
        let Some(rules) = &self.config.iam_policies else {
            return;
        };
        for inline in &spec.inline_policies {
            for (i, statement) in inline.policy.statement.iter().enumerate() {
                let path = format!("spec.inlinePolicies[{}].statement[{}]", inline.name, i);
                self.check_statement(rules, statement, &path, report);
            }
        }
    }

    fn check_statement(
        &self,
        rules: &IamPolicyRules,
        statement: &PermissionStatement,
        path: &str,
        report: &mut impl FnMut(String, String),
    ) {
        let actions = statement.action.to_vec();
        let action_field = format!("{}.action", path);

        for action in &actions {
            for (_, regex) in &self.forbidden_actions {
                if regex.is_match(action) {
                    report(
                        action_field.clone(),
                        format!("IAM policy contains forbidden action '{}'", action),
                    );
                }
            }
        }

        if !rules.allow_admin_permissions {
            for action in actions.iter().filter(|a| *a == "*" || a.ends_with(":*")) {
                report(
                    action_field.clone(),
                    format!("IAM policy contains admin permissions '{}' which are not allowed", action),
                );
            }
        }

        if !rules.allow_wildcard_resources && statement.resource.to_vec().iter().any(|r| r == "*") {
            report(
                format!("{}.resource", path),
                "IAM policy contains wildcard resource '*' which is not allowed".to_string(),
            );
        }

        if rules.require_mfa_for_sensitive_actions
            && statement.effect == "Allow"
            && !has_mfa_condition(statement.condition.as_ref())
        {
            for action in &actions {
                if self.sensitive_actions.iter().any(|(_, regex)| regex.is_match(action)) {
                    report(
                        format!("{}.condition", path),
                        format!("Sensitive action '{}' requires MFA condition", action),
                    );
                }
            }
        }
    }

    fn check_lambda(&self, spec: &LambdaSpec, report: &mut impl FnMut(String, String)) {
        let Some(rules) = &self.config.lambda_security else {
            return;
        };
        if rules.require_vpc && spec.vpc_config.is_none() {
            report(
                "spec.vpcConfig".to_string(),
                "Lambda functions must be deployed in a VPC for security compliance".to_string(),
            );
        }
        if let (Some(max), Some(timeout)) = (rules.max_timeout, spec.timeout) {
            if max > 0 && timeout > max {
                report(
                    "spec.timeout".to_string(),
                    format!("Lambda timeout ({}) exceeds maximum allowed ({})", timeout, max),
                );
            }
        }
        if let (Some(max), Some(memory)) = (rules.max_memory_size, spec.memory_size) {
            if max > 0 && memory > max {
                report(
                    "spec.memorySize".to_string(),
                    format!("Lambda memory size ({}) exceeds maximum allowed ({})", memory, max),
                );
            }
        }
        if !rules.allowed_runtimes.is_empty() && !rules.allowed_runtimes.contains(&spec.runtime) {
            report(
                "spec.runtime".to_string(),
                format!(
                    "Runtime '{}' is not in the allowed list: [{}]",
                    spec.runtime,
                    rules.allowed_runtimes.join(", ")
                ),
            );
        }
        for (name, value) in &spec.environment {
            let field = format!("spec.environment.{}", name);
            for (pattern, regex) in &self.forbidden_env {
                if regex.is_match(name) {
                    report(
                        field.clone(),
                        format!("Environment variable '{}' matches forbidden pattern '{}'", name, pattern),
                    );
                }
                if regex.is_match(value) {
                    report(
                        field.clone(),
                        format!(
                            "Environment variable value for '{}' matches forbidden pattern '{}'",
                            name, pattern
                        ),
                    );
                }
            }
        }
    }

    fn check_agent(&self, spec: &AgentSpec, report: &mut impl FnMut(String, String)) {
        let Some(rules) = &self.config.agent_security else {
            return;
        };
        if rules.require_guardrails && spec.guardrail.is_none() {
            report(
                "spec.guardrail".to_string(),
                "Bedrock agents must have guardrails configured for security compliance".to_string(),
            );
        }
        if let (Some(max), Some(ttl)) = (rules.max_idle_session_ttl, spec.idle_session_ttl) {
            if max > 0 && ttl > max {
                report(
                    "spec.idleSessionTtl".to_string(),
                    format!("Idle session timeout ({}) exceeds maximum allowed ({})", ttl, max),
                );
            }
        }
        let has_key = spec
            .customer_encryption_key
            .as_deref()
            .is_some_and(|key| !key.is_empty());
        if rules.require_customer_encryption && !has_key {
            report(
                "spec.customerEncryptionKey".to_string(),
                "Customer-managed encryption key is required for this agent".to_string(),
            );
        }
        for model in &rules.forbidden_models {
            if spec.foundation_model.contains(model.as_str()) {
                report(
                    "spec.foundationModel".to_string(),
                    format!(
                        "Foundation model '{}' contains forbidden pattern '{}'",
                        spec.foundation_model, model
                    ),
                );
            }
        }
        if rules.require_memory_configuration && spec.memory_configuration.is_none() {
            report(
                "spec.memoryConfiguration".to_string(),
                "Memory configuration is required for security compliance".to_string(),
            );
        }
    }

    fn check_knowledge_base(&self, spec: &KnowledgeBaseSpec, report: &mut impl FnMut(String, String)) {
        let Some(rules) = &self.config.knowledge_base_security else {
            return;
        };
        if rules.allowed_data_source_types.is_empty() {
            return;
        }
        for (i, source) in spec.data_sources.iter().enumerate() {
            if !rules.allowed_data_source_types.contains(&source.r#type) {
                report(
                    format!("spec.dataSources[{}].type", i),
                    format!(
                        "Data source type '{}' is not in the allowed list: [{}]",
                        source.r#type,
                        rules.allowed_data_source_types.join(", ")
                    ),
                );
            }
        }
    }
}

/// Whether any key of the condition block, at any depth, names an MFA
/// context key.
fn has_mfa_condition(condition: Option<&FreeForm>) -> bool {
    fn walk(value: &FreeForm) -> bool {
        match value {
            serde_yaml::Value::Mapping(map) => map.iter().any(|(key, inner)| {
                yaml_key(key).is_some_and(|k| MFA_CONDITION_KEYS.iter().any(|p| k.contains(p)))
                    || walk(inner)
            }),
            _ => false,
        }
    }
    condition.is_some_and(walk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::test_support::document;

    fn role(statement: &str) -> Document {
        document(&format!(
            "kind: IAMRole\nmetadata:\n  name: r\nspec:\n  assumeRolePolicy:\n    version: \"2012-10-17\"\n    statement:\n      - effect: Allow\n        principal: {{ Service: lambda.amazonaws.com }}\n        action: sts:AssumeRole\n  inlinePolicies:\n    - name: inline\n      policy:\n        version: \"2012-10-17\"\n        statement:\n{}",
            statement
        ))
    }

    #[test]
    fn test_iam_admin_and_forbidden_actions() {
        let validator = SecurityValidator::new(SecurityPolicyConfig::default_profile()).unwrap();
        let doc = role("          - effect: Allow\n            action: [\"s3:*\", iam:CreateAccessKey]\n            resource: \"*\"\n");
        let issues = validator.validate(&doc);
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "IAM policy contains forbidden action 'iam:CreateAccessKey'",
                "IAM policy contains admin permissions 's3:*' which are not allowed",
            ]
        );
        assert_eq!(issues[0].field, "spec.inlinePolicies[inline].statement[0].action");
    }

    #[test]
    fn test_enterprise_requires_mfa_and_specific_resources() {
        let validator = SecurityValidator::new(SecurityPolicyConfig::enterprise()).unwrap();
        let doc = role("          - effect: Allow\n            action: kms:Decrypt\n            resource: \"*\"\n");
        let fields: Vec<_> = validator.validate(&doc).into_iter().map(|i| i.field).collect();
        assert_eq!(
            fields,
            vec![
                "spec.inlinePolicies[inline].statement[0].resource".to_string(),
                "spec.inlinePolicies[inline].statement[0].condition".to_string(),
            ]
        );

        let with_mfa = role(
            "          - effect: Allow\n            action: kms:Decrypt\n            resource: arn:aws:kms:us-east-1:123:key/abc\n            condition:\n              Bool:\n                aws:MultiFactorAuthPresent: \"true\"\n",
        );
        assert!(validator.validate(&with_mfa).is_empty());
    }

    #[test]
    fn test_lambda_limits_and_environment() {
        let validator = SecurityValidator::new(SecurityPolicyConfig::default_profile()).unwrap();
        let doc = document(
            "kind: Lambda\nmetadata:\n  name: fn\nspec:\n  runtime: ruby3.2\n  handler: app.handler\n  code:\n    source: directory\n  timeout: 901\n  memorySize: 512\n  environment:\n    API_TOKEN: abc\n    REGION: us-east-1\n",
        );
        let messages: Vec<_> = validator.validate(&doc).into_iter().map(|i| i.message).collect();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], "Lambda timeout (901) exceeds maximum allowed (900)");
        assert!(messages[1].starts_with("Runtime 'ruby3.2' is not in the allowed list"));
        assert_eq!(
            messages[2],
            "Environment variable 'API_TOKEN' matches forbidden pattern '(?i)(password|secret|key|token)'"
        );
    }

    #[test]
    fn test_enterprise_agent_rules() {
        let validator = SecurityValidator::new(SecurityPolicyConfig::enterprise()).unwrap();
        let doc = document(
            "kind: Agent\nmetadata:\n  name: a\nspec:\n  foundationModel: anthropic.claude-instant-v1\n  instruction: help\n  idleSessionTtl: 3600\n",
        );
        let fields: Vec<_> = validator.validate(&doc).into_iter().map(|i| i.field).collect();
        assert_eq!(
            fields,
            vec![
                "spec.guardrail",
                "spec.idleSessionTtl",
                "spec.customerEncryptionKey",
                "spec.foundationModel",
                "spec.memoryConfiguration",
            ]
        );
    }

    #[test]
    fn test_knowledge_base_source_types() {
        let rules = SecurityPolicyConfig {
            knowledge_base_security: Some(KnowledgeBaseSecurityRules {
                allowed_data_source_types: vec!["S3".to_string()],
            }),
            ..SecurityPolicyConfig::default()
        };
        let validator = SecurityValidator::new(rules).unwrap();
        let doc = document(
            "kind: KnowledgeBase\nmetadata:\n  name: kb\nspec:\n  knowledgeBaseConfiguration:\n    type: VECTOR\n  storageConfiguration:\n    type: OPENSEARCH_SERVERLESS\n  dataSources:\n    - name: docs\n      type: S3\n    - name: wiki\n      type: WEB\n",
        );
        let issues = validator.validate(&doc);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "spec.dataSources[1].type");
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let rules = SecurityPolicyConfig {
            lambda_security: Some(LambdaSecurityRules {
                forbidden_env_patterns: vec!["(unclosed".to_string()],
                ..LambdaSecurityRules::default()
            }),
            ..SecurityPolicyConfig::default()
        };
        assert!(SecurityValidator::new(rules).is_err());
    }
}
