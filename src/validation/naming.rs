//! Naming conventions for `metadata.name`.

use super::{IssueKind, Severity, ValidationContext, ValidationIssue};
use crate::error::ForgeError;
use crate::model::Document;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingConventionConfig {
    #[serde(default)]
    pub global: Option<NamingRules>,
    /// Keyed by kind, e.g. `Agent`, `IAMRole`.
    #[serde(default)]
    pub resources: BTreeMap<String, NamingRules>,
    #[serde(default)]
    pub teams: BTreeMap<String, NamingRules>,
    #[serde(default)]
    pub environments: BTreeMap<String, NamingRules>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingRules {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Character class body, e.g. `a-z0-9-`.
    #[serde(default)]
    pub allowed_chars: Option<String>,
    #[serde(default)]
    pub forbidden_chars: Option<String>,
    #[serde(default)]
    pub force_lowercase: bool,
    #[serde(default)]
    pub force_uppercase: bool,
    /// Replaces the generated message.
    #[serde(default)]
    pub validation_message: Option<String>,
    /// Violations are warnings unless set to `error`.
    #[serde(default)]
    pub severity: Option<Severity>,
}

impl NamingRules {
    fn with_pattern(suffix: Option<&str>, pattern: &str, message: Option<&str>) -> Self {
        Self {
            suffix: suffix.map(str::to_string),
            pattern: Some(pattern.to_string()),
            validation_message: message.map(str::to_string),
            ..Self::default()
        }
    }

    fn prefixed(prefix: &str) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
            ..Self::default()
        }
    }
}

const KIND_SUFFIXES: [(&str, &str); 7] = [
    ("Agent", "agent"),
    ("Lambda", "lambda"),
    ("ActionGroup", "action-group"),
    ("KnowledgeBase", "kb"),
    ("Guardrail", "guardrail"),
    ("Prompt", "prompt"),
    ("IAMRole", "role"),
];

impl NamingConventionConfig {
    pub fn default_profile() -> Self {
        let resources = KIND_SUFFIXES
            .iter()
            .map(|(kind, suffix)| {
                let head = if *kind == "IAMRole" { "[a-zA-Z][a-zA-Z0-9-]*" } else { "[a-z][a-z0-9-]*" };
                let rules = NamingRules::with_pattern(
                    Some(&format!("-{}", suffix)),
                    &format!("^{}-{}$", head, suffix),
                    None,
                );
                (kind.to_string(), rules)
            })
            .collect();

        Self {
            global: Some(NamingRules {
                min_length: Some(3),
                max_length: Some(64),
                allowed_chars: Some("a-zA-Z0-9-_".to_string()),
                forbidden_chars: Some(" ".to_string()),
                pattern: Some("^[a-zA-Z][a-zA-Z0-9-_]*$".to_string()),
                ..NamingRules::default()
            }),
            resources,
            teams: [("engineering", "eng-"), ("data", "data-"), ("security", "sec-")]
                .into_iter()
                .map(|(team, prefix)| (team.to_string(), NamingRules::prefixed(prefix)))
                .collect(),
            environments: ["dev", "staging", "prod"]
                .into_iter()
                .map(|env| (env.to_string(), NamingRules::prefixed(&format!("{}-", env))))
                .collect(),
        }
    }

    /// `<team>-<env>-<name>-<suffix>`, lowercase, reported as errors.
    pub fn enterprise() -> Self {
        let resources = KIND_SUFFIXES
            .iter()
            .map(|(kind, suffix)| {
                let mut rules = NamingRules::with_pattern(
                    None,
                    &format!("^[a-z]+-(dev|staging|prod)-[a-z0-9-]+-{}$", suffix),
                    Some(&format!(
                        "{} names must follow pattern: <team>-<env>-<name>-{}",
                        kind, suffix
                    )),
                );
                rules.severity = Some(Severity::Error);
                (kind.to_string(), rules)
            })
            .collect();

        Self {
            global: Some(NamingRules {
                min_length: Some(5),
                max_length: Some(50),
                allowed_chars: Some("a-z0-9-".to_string()),
                force_lowercase: true,
                pattern: Some("^[a-z][a-z0-9-]*[a-z0-9]$".to_string()),
                severity: Some(Severity::Error),
                ..NamingRules::default()
            }),
            resources,
            teams: BTreeMap::new(),
            environments: BTreeMap::new(),
        }
    }
}

/// A rule set with its regexes compiled.
struct CompiledRules {
    rules: NamingRules,
    pattern: Option<Regex>,
    allowed: Option<Regex>,
    forbidden: Option<Regex>,
}

impl CompiledRules {
    fn new(scope: &str, rules: NamingRules) -> Result<Self, ForgeError> {
        let compile = |source: Option<String>| -> Result<Option<Regex>, ForgeError> {
            source
                .map(|s| {
                    Regex::new(&s).map_err(|e| {
                        ForgeError::ConfigError(format!(
                            "Invalid naming pattern '{}' for {}: {}",
                            s, scope, e
                        ))
                    })
                })
                .transpose()
        };
        Ok(Self {
            pattern: compile(rules.pattern.clone().filter(|p| !p.is_empty()))?,
            allowed: compile(
                rules
                    .allowed_chars
                    .as_ref()
                    .filter(|c| !c.is_empty())
                    .map(|c| format!("^[{}]+$", c)),
            )?,
            forbidden: compile(
                rules
                    .forbidden_chars
                    .as_ref()
                    .filter(|c| !c.is_empty())
                    .map(|c| format!("[{}]", c)),
            )?,
            rules,
        })
    }

    /// First violation of this rule set, if any.
    fn first_violation(&self, name: &str) -> Option<String> {
        let rules = &self.rules;
        let length = name.chars().count();

        let violation = if let Some(prefix) = rules.prefix.as_deref().filter(|p| !name.starts_with(*p)) {
            format!("Resource name '{}' must start with prefix '{}'", name, prefix)
        } else if let Some(suffix) = rules.suffix.as_deref().filter(|s| !name.ends_with(*s)) {
            format!("Resource name '{}' must end with suffix '{}'", name, suffix)
        } else if self.pattern.as_ref().is_some_and(|p| !p.is_match(name)) {
            format!(
                "Resource name '{}' does not match required pattern '{}'",
                name,
                rules.pattern.as_deref().unwrap_or_default()
            )
        } else if let Some(min) = rules.min_length.filter(|min| *min > 0 && length < *min) {
            format!("Resource name '{}' must be at least {} characters long", name, min)
        } else if let Some(max) = rules.max_length.filter(|max| *max > 0 && length > *max) {
            format!("Resource name '{}' must be at most {} characters long", name, max)
        } else if self.allowed.as_ref().is_some_and(|a| !a.is_match(name)) {
            format!(
                "Resource name '{}' contains invalid characters. Allowed: {}",
                name,
                rules.allowed_chars.as_deref().unwrap_or_default()
            )
        } else if self.forbidden.as_ref().is_some_and(|f| f.is_match(name)) {
            format!(
                "Resource name '{}' contains forbidden characters: {}",
                name,
                rules.forbidden_chars.as_deref().unwrap_or_default()
            )
        } else if rules.force_lowercase && name != name.to_lowercase() {
            format!("Resource name '{}' must be lowercase", name)
        } else if rules.force_uppercase && name != name.to_uppercase() {
            format!("Resource name '{}' must be uppercase", name)
        } else {
            return None;
        };

        Some(rules.validation_message.clone().unwrap_or(violation))
    }
}

pub struct NamingValidator {
    global: Option<CompiledRules>,
    resources: BTreeMap<String, CompiledRules>,
    teams: BTreeMap<String, CompiledRules>,
    environments: BTreeMap<String, CompiledRules>,
}

fn compile_map(
    scope: &str,
    rules: BTreeMap<String, NamingRules>,
) -> Result<BTreeMap<String, CompiledRules>, ForgeError> {
    rules
        .into_iter()
        .map(|(key, rules)| {
            let compiled = CompiledRules::new(&format!("{} '{}'", scope, key), rules)?;
            Ok((key, compiled))
        })
        .collect()
}

impl NamingValidator {
    pub fn new(config: NamingConventionConfig) -> Result<Self, ForgeError> {
        Ok(Self {
            global: config
                .global
                .map(|rules| CompiledRules::new("global rules", rules))
                .transpose()?,
            resources: compile_map("kind", config.resources)?,
            teams: compile_map("team", config.teams)?,
            environments: compile_map("environment", config.environments)?,
        })
    }

    /// Global, then kind, team and environment rules; one issue per rule
    /// set at most.
    pub fn validate(&self, document: &Document, context: &ValidationContext) -> Vec<ValidationIssue> {
        let applicable = self
            .global
            .iter()
            .chain(self.resources.get(document.kind().as_str()))
            .chain(context.team.as_ref().and_then(|team| self.teams.get(team)))
            .chain(
                context
                    .environment
                    .as_ref()
                    .and_then(|env| self.environments.get(env)),
            );

        applicable
            .filter_map(|rules| {
                rules.first_violation(document.name()).map(|message| {
                    ValidationIssue::new(IssueKind::NamingConvention, document, "metadata.name", message)
                        .with_severity(rules.rules.severity.unwrap_or(Severity::Warning))
                })
            })
            .collect()
    }
}
