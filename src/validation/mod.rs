//! Policy validation
//!
//! Naming conventions, tagging policies and security policies checked
//! against every registered document, plus the registry's own dependency
//! validation. Rule sets come from a `validation.yml` file or one of the
//! built-in profiles (`default`, `enterprise`).

pub mod naming;
pub mod security;
pub mod tagging;

use crate::config::ValidationSection;
use crate::error::ForgeError;
use crate::model::Document;
use crate::registry::Registry;
use naming::{NamingConventionConfig, NamingValidator};
use security::{SecurityPolicyConfig, SecurityValidator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tagging::{TaggingPolicyConfig, TaggingValidator};
use tracing::{debug, info, warn};

/// File looked up in the scanned directory when no explicit config is given.
pub const LOCAL_CONFIG_FILE: &str = "validation.yml";

const VALIDATOR_NAMES: [&str; 3] = ["naming", "tagging", "security"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

/// Which check produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NamingConvention,
    TaggingPolicy,
    TagValidation,
    SecurityPolicy,
    Dependency,
}

/// One finding against one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    /// `Kind/name` of the offending document.
    pub resource: String,
    /// Path of the offending field, e.g. `spec.tags.Owner`.
    pub field: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub(crate) fn new(
        kind: IssueKind,
        document: &Document,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            resource: document.id(),
            field: field.into(),
            severity: Severity::Error,
        }
    }

    pub(crate) fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Rule sets for every validator. Absent sections disable that validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfig {
    #[serde(default)]
    pub naming_conventions: Option<NamingConventionConfig>,
    #[serde(default)]
    pub tagging_policies: Option<TaggingPolicyConfig>,
    #[serde(default)]
    pub security_policies: Option<SecurityPolicyConfig>,
    /// `naming`, `tagging`, `security` or `all`. Empty enables everything.
    #[serde(default)]
    pub enabled_validators: Vec<String>,
}

impl ValidationConfig {
    pub fn default_profile() -> Self {
        Self {
            naming_conventions: Some(NamingConventionConfig::default_profile()),
            tagging_policies: Some(TaggingPolicyConfig::default_profile()),
            security_policies: Some(SecurityPolicyConfig::default_profile()),
            enabled_validators: VALIDATOR_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn enterprise() -> Self {
        Self {
            naming_conventions: Some(NamingConventionConfig::enterprise()),
            tagging_policies: Some(TaggingPolicyConfig::enterprise()),
            security_policies: Some(SecurityPolicyConfig::enterprise()),
            enabled_validators: VALIDATOR_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Built-in profile by name.
    pub fn profile(name: &str) -> Result<Self, ForgeError> {
        match name {
            "default" => Ok(Self::default_profile()),
            "enterprise" => Ok(Self::enterprise()),
            other => Err(ForgeError::InvalidArgument(format!(
                "Unknown validation profile '{}' (expected 'default' or 'enterprise')",
                other
            ))),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ForgeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ForgeError::ConfigError(format!("Failed to read validation config {:?}: {}", path, e))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            ForgeError::ConfigError(format!("Invalid validation config {:?}: {}", path, e))
        })
    }

    /// Pick the rule set for a run over `root`.
    ///
    /// An explicit path (argument, then `validation.config_path`) must load.
    /// A local `validation.yml` that fails to load is reported and the
    /// configured profile is used instead.
    pub fn resolve(
        section: &ValidationSection,
        explicit: Option<&Path>,
        root: &Path,
    ) -> Result<(Self, ConfigSource), ForgeError> {
        if let Some(path) = explicit.map(Path::to_path_buf).or_else(|| section.config_path.clone()) {
            let config = Self::from_file(&path)?;
            info!(config = %path.display(), "Using custom validation configuration");
            return Ok((config, ConfigSource::File(path)));
        }

        let local = root.join(LOCAL_CONFIG_FILE);
        if local.is_file() {
            match Self::from_file(&local) {
                Ok(config) => {
                    info!(config = %local.display(), "Using local validation configuration");
                    return Ok((config, ConfigSource::File(local)));
                }
                Err(e) => warn!(error = %e, "Failed to load local validation config, using profile"),
            }
        }

        let config = Self::profile(&section.profile)?;
        info!(profile = %section.profile, "Using built-in validation configuration");
        Ok((config, ConfigSource::Profile(section.profile.clone())))
    }

    fn is_enabled(&self, validator: &str) -> bool {
        self.enabled_validators.is_empty()
            || self
                .enabled_validators
                .iter()
                .any(|name| name == validator || name == "all")
    }
}

/// Where the active rule set came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Profile(String),
    File(PathBuf),
}

/// Team, environment and project inferred from the scanned path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationContext {
    pub team: Option<String>,
    pub environment: Option<String>,
    pub project: Option<String>,
}

const TEAM_WORDS: [&str; 6] = ["engineering", "data", "security", "operations", "product", "finance"];

impl ValidationContext {
    pub fn from_path(path: &Path) -> Self {
        let components: Vec<String> = path
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let team = components.iter().find_map(|component| {
            if let Some(team) = component.strip_prefix("team-") {
                return Some(team.to_string());
            }
            let lower = component.to_lowercase();
            TEAM_WORDS
                .iter()
                .find(|word| lower.contains(*word))
                .map(|word| word.to_string())
        });

        let environment = components.iter().find_map(|component| {
            match component.to_lowercase().as_str() {
                "dev" | "development" => Some("dev".to_string()),
                "staging" | "stage" => Some("staging".to_string()),
                "prod" | "production" => Some("prod".to_string()),
                _ => None,
            }
        });

        Self {
            team,
            environment,
            project: components.last().cloned(),
        }
    }
}

/// Outcome of validating a registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub total_resources: usize,
    /// Documents with no error-severity issue.
    pub valid_resources: usize,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the enabled validators.
pub struct Validator {
    naming: Option<NamingValidator>,
    tagging: Option<TaggingValidator>,
    security: Option<SecurityValidator>,
}

impl Validator {
    /// Compile every rule set. A bad pattern or validator name is a
    /// configuration error.
    pub fn new(config: ValidationConfig) -> Result<Self, ForgeError> {
        for name in &config.enabled_validators {
            if name != "all" && !VALIDATOR_NAMES.contains(&name.as_str()) {
                return Err(ForgeError::ConfigError(format!(
                    "Unknown validator '{}' in enabledValidators",
                    name
                )));
            }
        }

        let naming = match (&config.naming_conventions, config.is_enabled("naming")) {
            (Some(rules), true) => Some(NamingValidator::new(rules.clone())?),
            _ => None,
        };
        let tagging = match (&config.tagging_policies, config.is_enabled("tagging")) {
            (Some(rules), true) => Some(TaggingValidator::new(rules.clone())?),
            _ => None,
        };
        let security = match (&config.security_policies, config.is_enabled("security")) {
            (Some(rules), true) => Some(SecurityValidator::new(rules.clone())?),
            _ => None,
        };
        debug!(
            naming = naming.is_some(),
            tagging = tagging.is_some(),
            security = security.is_some(),
            "Validator ready"
        );
        Ok(Self {
            naming,
            tagging,
            security,
        })
    }

    pub fn validate_document(&self, document: &Document, context: &ValidationContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if let Some(naming) = &self.naming {
            issues.extend(naming.validate(document, context));
        }
        if let Some(tagging) = &self.tagging {
            issues.extend(tagging.validate(document, context));
        }
        if let Some(security) = &self.security {
            issues.extend(security.validate(document));
        }
        issues
    }

    /// Validate every document, then the registry's references.
    pub fn validate_registry(&self, registry: &Registry, context: &ValidationContext) -> ValidationReport {
        let mut report = ValidationReport {
            total_resources: registry.get_total_resource_count(),
            ..ValidationReport::default()
        };

        for document in registry.get_all_resources() {
            for issue in self.validate_document(&document, context) {
                match issue.severity {
                    Severity::Error => report.errors.push(issue),
                    Severity::Warning => report.warnings.push(issue),
                }
            }
        }

        for error in registry.validate_dependencies() {
            let (kind, name) = error.owner();
            report.errors.push(ValidationIssue {
                kind: IssueKind::Dependency,
                message: error.to_string(),
                resource: format!("{}/{}", kind, name),
                field: dependency_field(&error),
                severity: Severity::Error,
            });
        }

        let invalid: BTreeSet<&str> = report.errors.iter().map(|e| e.resource.as_str()).collect();
        report.valid_resources = report.total_resources.saturating_sub(invalid.len());
        info!(
            resources = report.total_resources,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Validation finished"
        );
        report
    }
}

fn dependency_field(error: &crate::error::DependencyError) -> String {
    use crate::error::DependencyError;
    match error {
        DependencyError::Unresolved { field, .. }
        | DependencyError::WrongKind { field, .. }
        | DependencyError::AmbiguousReference { field, .. } => field.clone(),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::model::Document;
    use crate::parser::YamlParser;
    use std::path::Path;

    /// Decode a single document from YAML.
    pub fn document(yaml: &str) -> Document {
        let parsed = YamlParser::new().parse_str(yaml, Path::new("/defs/test.yml"));
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        parsed.documents.into_iter().next().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::add;
    use tempfile::TempDir;

    #[test]
    fn test_context_from_path() {
        let context = ValidationContext::from_path(Path::new("/repos/team-payments/prod/checkout"));
        assert_eq!(context.team.as_deref(), Some("payments"));
        assert_eq!(context.environment.as_deref(), Some("prod"));
        assert_eq!(context.project.as_deref(), Some("checkout"));

        let context = ValidationContext::from_path(Path::new("/work/DataPlatform/Development/kb"));
        assert_eq!(context.team.as_deref(), Some("data"));
        assert_eq!(context.environment.as_deref(), Some("dev"));
    }

    #[test]
    fn test_unknown_profile_is_rejected() {
        assert!(ValidationConfig::profile("enterprise").is_ok());
        assert!(matches!(
            ValidationConfig::profile("strict"),
            Err(ForgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_validator_name_is_a_config_error() {
        let config = ValidationConfig {
            enabled_validators: vec!["spelling".to_string()],
            ..ValidationConfig::default()
        };
        assert!(matches!(Validator::new(config), Err(ForgeError::ConfigError(_))));
    }

    #[test]
    fn test_local_file_wins_over_profile() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(LOCAL_CONFIG_FILE),
            "enabledValidators: [tagging]\ntaggingPolicies:\n  global:\n    requiredTags: [Owner]\n",
        )
        .unwrap();
        let (config, source) =
            ValidationConfig::resolve(&ValidationSection::default(), None, dir.path()).unwrap();
        assert_eq!(source, ConfigSource::File(dir.path().join(LOCAL_CONFIG_FILE)));
        assert!(config.naming_conventions.is_none());
        assert!(config.is_enabled("tagging"));
        assert!(!config.is_enabled("naming"));

        let empty = TempDir::new().unwrap();
        let (_, source) =
            ValidationConfig::resolve(&ValidationSection::default(), None, empty.path()).unwrap();
        assert_eq!(source, ConfigSource::Profile("default".to_string()));
    }

    #[test]
    fn test_explicit_config_must_load() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.yml");
        assert!(ValidationConfig::resolve(&ValidationSection::default(), Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_registry_report_counts_invalid_documents_once() {
        let registry = Registry::new();
        add(&registry, "Agent", "support", "foundationModel: m\ninstruction: help\nguardrail:\n  name: missing\n");
        add(&registry, "Guardrail", "safety", "contentPolicyConfig:\n  filtersConfig:\n    - type: HATE\n      inputStrength: HIGH\n      outputStrength: HIGH\n");

        let config = ValidationConfig {
            tagging_policies: Some(TaggingPolicyConfig {
                global: Some(tagging::TaggingRequirements {
                    required_tags: vec!["Owner".to_string()],
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..ValidationConfig::default()
        };
        let validator = Validator::new(config).unwrap();
        let report = validator.validate_registry(&registry, &ValidationContext::default());

        assert_eq!(report.total_resources, 2);
        // both lack Owner; the agent also has a broken guardrail reference
        assert_eq!(report.errors.len(), 3);
        assert_eq!(report.valid_resources, 0);
        assert!(!report.success());
        let dependency = report
            .errors
            .iter()
            .find(|e| e.kind == IssueKind::Dependency)
            .unwrap();
        assert_eq!(dependency.resource, "Agent/support");
        assert_eq!(dependency.field, "spec.guardrail.name");
    }
}
