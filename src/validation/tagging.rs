//! Tagging policies: required, forbidden and recommended tags plus
//! per-tag value rules.

use super::{IssueKind, Severity, ValidationContext, ValidationIssue};
use crate::error::ForgeError;
use crate::model::Document;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggingPolicyConfig {
    #[serde(default)]
    pub global: Option<TaggingRequirements>,
    #[serde(default)]
    pub resources: BTreeMap<String, TaggingRequirements>,
    #[serde(default)]
    pub teams: BTreeMap<String, TaggingRequirements>,
    #[serde(default)]
    pub environments: BTreeMap<String, TaggingRequirements>,
    #[serde(default)]
    pub tag_validation: BTreeMap<String, TagValidationRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggingRequirements {
    #[serde(default)]
    pub required_tags: Vec<String>,
    /// Missing optional tags are warnings.
    #[serde(default)]
    pub optional_tags: Vec<String>,
    #[serde(default)]
    pub forbidden_tags: Vec<String>,
    /// Replaces the message for missing required tags.
    #[serde(default)]
    pub validation_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagValidationRule {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed_values: Vec<String>,
    #[serde(default)]
    pub forbidden_values: Vec<String>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub validation_message: Option<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn requirements(required: &[&str], optional: &[&str]) -> TaggingRequirements {
    TaggingRequirements {
        required_tags: strings(required),
        optional_tags: strings(optional),
        ..TaggingRequirements::default()
    }
}

fn one_of(values: &[&str]) -> TagValidationRule {
    TagValidationRule {
        allowed_values: strings(values),
        ..TagValidationRule::default()
    }
}

fn matching(pattern: &str, message: &str) -> TagValidationRule {
    TagValidationRule {
        pattern: Some(pattern.to_string()),
        validation_message: Some(message.to_string()),
        ..TagValidationRule::default()
    }
}

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

impl TaggingPolicyConfig {
    pub fn default_profile() -> Self {
        Self {
            global: Some(requirements(
                &["Environment", "Project", "Owner"],
                &["CostCenter", "Team", "Contact"],
            )),
            resources: BTreeMap::from([
                (
                    "Agent".to_string(),
                    requirements(
                        &["AgentType", "BusinessFunction"],
                        &["DataClassification", "ComplianceLevel"],
                    ),
                ),
                (
                    "Lambda".to_string(),
                    requirements(&["Runtime", "FunctionType"], &["ScheduleType", "TriggerType"]),
                ),
                (
                    "KnowledgeBase".to_string(),
                    requirements(
                        &["DataSource", "ContentType"],
                        &["DataClassification", "RefreshSchedule"],
                    ),
                ),
            ]),
            teams: BTreeMap::new(),
            environments: BTreeMap::new(),
            tag_validation: BTreeMap::from([
                ("Environment".to_string(), one_of(&["dev", "staging", "prod", "test"])),
                (
                    "Owner".to_string(),
                    matching(EMAIL_PATTERN, "Owner must be a valid email address"),
                ),
                (
                    "CostCenter".to_string(),
                    matching(r"^CC-\d{4}$", "CostCenter must follow format: CC-XXXX (e.g., CC-1234)"),
                ),
            ]),
        }
    }

    pub fn enterprise() -> Self {
        let mut agent = requirements(
            &["AgentType", "BusinessFunction", "DataProcessing", "SecurityLevel"],
            &[],
        );
        agent.validation_message = Some(
            "Bedrock agents require comprehensive tagging for compliance and cost tracking".to_string(),
        );

        Self {
            global: Some(requirements(
                &[
                    "Environment",
                    "Project",
                    "Owner",
                    "CostCenter",
                    "Team",
                    "BusinessUnit",
                    "DataClassification",
                    "ComplianceLevel",
                ],
                &["BackupRequired", "MonitoringLevel", "SLA"],
            )),
            resources: BTreeMap::from([
                ("Agent".to_string(), agent),
                (
                    "Lambda".to_string(),
                    requirements(&["Runtime", "FunctionType", "ExecutionRole", "SecurityLevel"], &[]),
                ),
                (
                    "KnowledgeBase".to_string(),
                    requirements(
                        &["DataSource", "ContentType", "DataSensitivity", "RetentionPeriod"],
                        &[],
                    ),
                ),
                (
                    "IAMRole".to_string(),
                    requirements(&["RoleType", "AccessLevel", "AuditRequired"], &[]),
                ),
            ]),
            teams: BTreeMap::new(),
            environments: BTreeMap::new(),
            tag_validation: BTreeMap::from([
                ("Environment".to_string(), one_of(&["dev", "staging", "prod"])),
                (
                    "Owner".to_string(),
                    matching(EMAIL_PATTERN, "Owner must be a valid corporate email address"),
                ),
                (
                    "CostCenter".to_string(),
                    matching(r"^CC-\d{6}$", "CostCenter must follow corporate format: CC-XXXXXX"),
                ),
                (
                    "Team".to_string(),
                    one_of(&[
                        "engineering",
                        "data",
                        "security",
                        "operations",
                        "product",
                        "compliance",
                        "finance",
                        "legal",
                    ]),
                ),
                (
                    "DataClassification".to_string(),
                    one_of(&["public", "internal", "confidential", "restricted"]),
                ),
                (
                    "ComplianceLevel".to_string(),
                    one_of(&["none", "pci", "hipaa", "sox", "gdpr"]),
                ),
                (
                    "SecurityLevel".to_string(),
                    one_of(&["low", "medium", "high", "critical"]),
                ),
            ]),
        }
    }
}

pub struct TaggingValidator {
    config: TaggingPolicyConfig,
    patterns: BTreeMap<String, Regex>,
}

impl TaggingValidator {
    pub fn new(config: TaggingPolicyConfig) -> Result<Self, ForgeError> {
        let mut patterns = BTreeMap::new();
        for (tag, rule) in &config.tag_validation {
            if let Some(pattern) = rule.pattern.as_deref().filter(|p| !p.is_empty()) {
                let regex = Regex::new(pattern).map_err(|e| {
                    ForgeError::ConfigError(format!(
                        "Invalid regex pattern for tag '{}': {}",
                        tag, e
                    ))
                })?;
                patterns.insert(tag.clone(), regex);
            }
        }
        Ok(Self { config, patterns })
    }

    /// Kinds without tags are skipped.
    pub fn validate(&self, document: &Document, context: &ValidationContext) -> Vec<ValidationIssue> {
        let Some(tags) = document.spec.tags() else {
            return Vec::new();
        };
        let config = &self.config;
        let applicable = config
            .global
            .iter()
            .chain(config.resources.get(document.kind().as_str()))
            .chain(context.team.as_ref().and_then(|team| config.teams.get(team)))
            .chain(
                context
                    .environment
                    .as_ref()
                    .and_then(|env| config.environments.get(env)),
            );

        let mut issues = Vec::new();
        for requirement in applicable {
            for tag in &requirement.required_tags {
                if !tags.contains_key(tag) {
                    let message = requirement
                        .validation_message
                        .clone()
                        .unwrap_or_else(|| format!("Required tag '{}' is missing", tag));
                    issues.push(issue(IssueKind::TaggingPolicy, document, tag, message));
                }
            }
            for tag in &requirement.forbidden_tags {
                if tags.contains_key(tag) {
                    let message = format!("Forbidden tag '{}' is present", tag);
                    issues.push(issue(IssueKind::TaggingPolicy, document, tag, message));
                }
            }
            for tag in &requirement.optional_tags {
                if !tags.contains_key(tag) {
                    let message = format!("Optional tag '{}' is missing (recommended for compliance)", tag);
                    issues.push(
                        issue(IssueKind::TaggingPolicy, document, tag, message)
                            .with_severity(Severity::Warning),
                    );
                }
            }
        }

        for (tag, value) in tags {
            if let Some(rule) = config.tag_validation.get(tag) {
                if let Some(message) = self.check_value(tag, value, rule) {
                    issues.push(issue(IssueKind::TagValidation, document, tag, message));
                }
            }
        }
        issues
    }

    /// First rule the value breaks.
    fn check_value(&self, tag: &str, value: &str, rule: &TagValidationRule) -> Option<String> {
        let fold = |s: &str| if rule.case_sensitive { s.to_string() } else { s.to_lowercase() };
        let folded = fold(value);
        let length = value.chars().count();

        let violation = if self.patterns.get(tag).is_some_and(|p| !p.is_match(value)) {
            format!(
                "Tag '{}' value '{}' does not match required pattern '{}'",
                tag,
                value,
                rule.pattern.as_deref().unwrap_or_default()
            )
        } else if !rule.allowed_values.is_empty()
            && !rule.allowed_values.iter().any(|allowed| fold(allowed) == folded)
        {
            format!(
                "Tag '{}' value '{}' is not in allowed values: [{}]",
                tag,
                value,
                rule.allowed_values.join(", ")
            )
        } else if rule.forbidden_values.iter().any(|forbidden| fold(forbidden) == folded) {
            format!("Tag '{}' value '{}' is forbidden", tag, value)
        } else if let Some(min) = rule.min_length.filter(|min| *min > 0 && length < *min) {
            format!("Tag '{}' value '{}' must be at least {} characters long", tag, value, min)
        } else if let Some(max) = rule.max_length.filter(|max| *max > 0 && length > *max) {
            format!("Tag '{}' value '{}' must be at most {} characters long", tag, value, max)
        } else {
            return None;
        };
        Some(rule.validation_message.clone().unwrap_or(violation))
    }
}

fn issue(kind: IssueKind, document: &Document, tag: &str, message: String) -> ValidationIssue {
    ValidationIssue::new(kind, document, format!("spec.tags.{}", tag), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::test_support::document;

    fn lambda(tags: &str) -> Document {
        document(&format!(
            "kind: Lambda\nmetadata:\n  name: fn\nspec:\n  runtime: python3.11\n  handler: app.handler\n  code:\n    source: directory\n  tags:\n{}",
            tags
        ))
    }

    #[test]
    fn test_missing_required_and_optional_tags() {
        let validator = TaggingValidator::new(TaggingPolicyConfig::default_profile()).unwrap();
        let doc = lambda(
            "    Environment: Prod\n    Project: support\n    Owner: team@example.com\n    Runtime: python\n",
        );
        let issues = validator.validate(&doc, &ValidationContext::default());

        let errors: Vec<_> = issues.iter().filter(|i| i.severity == Severity::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Required tag 'FunctionType' is missing");
        assert_eq!(errors[0].field, "spec.tags.FunctionType");
        assert_eq!(errors[0].resource, "Lambda/fn");

        let warnings = issues.iter().filter(|i| i.severity == Severity::Warning).count();
        // CostCenter, Team, Contact, ScheduleType, TriggerType
        assert_eq!(warnings, 5);
    }

    #[test]
    fn test_tag_values_are_checked() {
        let validator = TaggingValidator::new(TaggingPolicyConfig::default_profile()).unwrap();
        let doc = lambda("    Environment: qa\n    Owner: nobody\n    CostCenter: CC-1234\n");
        let issues: Vec<_> = validator
            .validate(&doc, &ValidationContext::default())
            .into_iter()
            .filter(|i| i.kind == IssueKind::TagValidation)
            .collect();

        assert_eq!(issues.len(), 2);
        assert_eq!(
            issues[0].message,
            "Tag 'Environment' value 'qa' is not in allowed values: [dev, staging, prod, test]"
        );
        assert_eq!(issues[1].message, "Owner must be a valid email address");
    }

    #[test]
    fn test_forbidden_values_respect_case_sensitivity() {
        let rule = TagValidationRule {
            forbidden_values: vec!["Temp".to_string()],
            case_sensitive: true,
            ..TagValidationRule::default()
        };
        let config = TaggingPolicyConfig {
            tag_validation: BTreeMap::from([("Stage".to_string(), rule)]),
            ..TaggingPolicyConfig::default()
        };
        let validator = TaggingValidator::new(config).unwrap();
        let rule = &validator.config.tag_validation["Stage"];
        assert!(validator.check_value("Stage", "temp", rule).is_none());
        assert_eq!(
            validator.check_value("Stage", "Temp", rule).unwrap(),
            "Tag 'Stage' value 'Temp' is forbidden"
        );
    }

    #[test]
    fn test_untagged_kinds_are_skipped() {
        let validator = TaggingValidator::new(TaggingPolicyConfig::enterprise()).unwrap();
        let doc = document(
            "kind: AgentKnowledgeBaseAssociation\nmetadata:\n  name: link\nspec:\n  agentName: a\n  knowledgeBaseName: kb\n",
        );
        assert!(validator.validate(&doc, &ValidationContext::default()).is_empty());
    }

    #[test]
    fn test_forbidden_tags_and_custom_message() {
        let config = TaggingPolicyConfig {
            environments: BTreeMap::from([(
                "prod".to_string(),
                TaggingRequirements {
                    required_tags: vec!["OnCall".to_string()],
                    forbidden_tags: vec!["Experimental".to_string()],
                    validation_message: Some("Production resources need an on-call rota".to_string()),
                    ..TaggingRequirements::default()
                },
            )]),
            ..TaggingPolicyConfig::default()
        };
        let validator = TaggingValidator::new(config).unwrap();
        let context = ValidationContext {
            environment: Some("prod".to_string()),
            ..ValidationContext::default()
        };
        let issues = validator.validate(&lambda("    Experimental: \"yes\"\n"), &context);
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Production resources need an on-call rota",
                "Forbidden tag 'Experimental' is present"
            ]
        );
    }
}
