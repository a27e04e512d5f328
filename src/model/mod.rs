//! Document model
//!
//! Typed representation of every resource kind. A [`Document`] is one YAML
//! document after decoding: identity (`kind`, `metadata.name`), the typed
//! spec, and where it came from. Specs expose their cross-document pointers
//! as [`ReferenceSite`]s so the registry and generator walk the same set.

pub mod action_group;
pub mod agent;
pub mod association;
pub mod common;
pub mod custom_module;
pub mod guardrail;
pub mod iam_role;
pub mod knowledge_base;
pub mod lambda;
pub mod opensearch;
pub mod prompt;
pub mod reference;

pub use action_group::ActionGroupSpec;
pub use agent::AgentSpec;
pub use association::AssociationSpec;
pub use common::{FreeForm, StringOrList, Tags, Timeouts};
pub use custom_module::CustomModuleSpec;
pub use guardrail::GuardrailSpec;
pub use iam_role::IamRoleSpec;
pub use knowledge_base::KnowledgeBaseSpec;
pub use lambda::LambdaSpec;
pub use opensearch::OpenSearchServerlessSpec;
pub use prompt::PromptSpec;
pub use reference::Reference;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Closed set of resource kinds understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ResourceKind {
    Agent,
    Lambda,
    ActionGroup,
    KnowledgeBase,
    Guardrail,
    Prompt,
    #[serde(rename = "IAMRole")]
    IamRole,
    CustomModule,
    AgentKnowledgeBaseAssociation,
    OpenSearchServerless,
}

impl ResourceKind {
    /// Every kind, in listing order.
    pub const ALL: [ResourceKind; 10] = [
        ResourceKind::Agent,
        ResourceKind::Lambda,
        ResourceKind::ActionGroup,
        ResourceKind::KnowledgeBase,
        ResourceKind::Guardrail,
        ResourceKind::Prompt,
        ResourceKind::IamRole,
        ResourceKind::CustomModule,
        ResourceKind::AgentKnowledgeBaseAssociation,
        ResourceKind::OpenSearchServerless,
    ];

    /// Canonical `kind` string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Agent => "Agent",
            ResourceKind::Lambda => "Lambda",
            ResourceKind::ActionGroup => "ActionGroup",
            ResourceKind::KnowledgeBase => "KnowledgeBase",
            ResourceKind::Guardrail => "Guardrail",
            ResourceKind::Prompt => "Prompt",
            ResourceKind::IamRole => "IAMRole",
            ResourceKind::CustomModule => "CustomModule",
            ResourceKind::AgentKnowledgeBaseAssociation => "AgentKnowledgeBaseAssociation",
            ResourceKind::OpenSearchServerless => "OpenSearchServerless",
        }
    }

    /// Decode a `kind` string, accepting the historical aliases.
    pub fn from_kind(value: &str) -> Option<Self> {
        let kind = match value {
            "Agent" => ResourceKind::Agent,
            "Lambda" | "Function" => ResourceKind::Lambda,
            "ActionGroup" | "ExecutorBinding" => ResourceKind::ActionGroup,
            "KnowledgeBase" => ResourceKind::KnowledgeBase,
            "Guardrail" => ResourceKind::Guardrail,
            "Prompt" => ResourceKind::Prompt,
            "IAMRole" => ResourceKind::IamRole,
            "CustomModule" | "CustomResources" => ResourceKind::CustomModule,
            "AgentKnowledgeBaseAssociation" | "KnowledgeBaseAssociation" => {
                ResourceKind::AgentKnowledgeBaseAssociation
            }
            "OpenSearchServerless" | "VectorCollection" => ResourceKind::OpenSearchServerless,
            _ => return None,
        };
        Some(kind)
    }

    /// One-line description used in inventory listings.
    pub fn description(&self) -> &'static str {
        match self {
            ResourceKind::Agent => "Bedrock agents",
            ResourceKind::Lambda => "Lambda functions backing action groups",
            ResourceKind::ActionGroup => "Agent action groups",
            ResourceKind::KnowledgeBase => "Knowledge bases",
            ResourceKind::Guardrail => "Content guardrails",
            ResourceKind::Prompt => "Managed prompts",
            ResourceKind::IamRole => "IAM roles",
            ResourceKind::CustomModule => "Custom Terraform modules",
            ResourceKind::AgentKnowledgeBaseAssociation => "Agent to knowledge base links",
            ResourceKind::OpenSearchServerless => "OpenSearch Serverless vector collections",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::from_kind(s).ok_or_else(|| format!("unknown resource kind '{}'", s))
    }
}

/// What a reference site may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTarget {
    Kind(ResourceKind),
    Any,
}

impl ReferenceTarget {
    pub fn accepts(&self, kind: ResourceKind) -> bool {
        match self {
            ReferenceTarget::Kind(k) => *k == kind,
            ReferenceTarget::Any => true,
        }
    }
}

impl fmt::Display for ReferenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceTarget::Kind(kind) => write!(f, "{}", kind),
            ReferenceTarget::Any => f.write_str("resource"),
        }
    }
}

/// An external identifier that can stand in for a reference (an ARN or an
/// id of something managed outside this tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalId<'a> {
    pub field: &'static str,
    pub value: &'a str,
}

/// One reference-bearing field inside a spec.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSite<'a> {
    pub field: String,
    pub reference: &'a Reference,
    pub target: ReferenceTarget,
    pub external: Option<ExternalId<'a>>,
}

impl<'a> ReferenceSite<'a> {
    pub fn new(field: impl Into<String>, reference: &'a Reference, target: ResourceKind) -> Self {
        Self {
            field: field.into(),
            reference,
            target: ReferenceTarget::Kind(target),
            external: None,
        }
    }

    pub fn any(field: impl Into<String>, reference: &'a Reference) -> Self {
        Self {
            field: field.into(),
            reference,
            target: ReferenceTarget::Any,
            external: None,
        }
    }

    /// Attach the escape-hatch field; blank values are ignored.
    pub fn with_external(mut self, field: &'static str, value: &'a Option<String>) -> Self {
        if let Some(value) = common::non_empty(value) {
            self.external = Some(ExternalId { field, value });
        }
        self
    }
}

/// Behaviour every typed spec provides.
pub trait Spec {
    const KIND: ResourceKind;

    /// Fields pointing at other documents, in declaration order.
    fn reference_sites(&self) -> Vec<ReferenceSite<'_>> {
        Vec::new()
    }

    /// Required-field checks beyond what decoding enforces.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }

    fn tags(&self) -> Option<&Tags> {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Where a document was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file_path: PathBuf,
    /// Zero-based index among the non-empty documents of the file.
    pub document_index: usize,
}

impl SourceLocation {
    pub fn directory(&self) -> Option<&Path> {
        self.file_path.parent()
    }
}

/// Typed spec of a document, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceSpec {
    Agent(AgentSpec),
    Lambda(LambdaSpec),
    ActionGroup(ActionGroupSpec),
    KnowledgeBase(KnowledgeBaseSpec),
    Guardrail(GuardrailSpec),
    Prompt(PromptSpec),
    IamRole(IamRoleSpec),
    CustomModule(CustomModuleSpec),
    Association(AssociationSpec),
    OpenSearchServerless(OpenSearchServerlessSpec),
}

macro_rules! dispatch {
    ($self:expr, $spec:ident => $body:expr) => {
        match $self {
            ResourceSpec::Agent($spec) => $body,
            ResourceSpec::Lambda($spec) => $body,
            ResourceSpec::ActionGroup($spec) => $body,
            ResourceSpec::KnowledgeBase($spec) => $body,
            ResourceSpec::Guardrail($spec) => $body,
            ResourceSpec::Prompt($spec) => $body,
            ResourceSpec::IamRole($spec) => $body,
            ResourceSpec::CustomModule($spec) => $body,
            ResourceSpec::Association($spec) => $body,
            ResourceSpec::OpenSearchServerless($spec) => $body,
        }
    };
}

fn kind_of<S: Spec>(_: &S) -> ResourceKind {
    S::KIND
}

impl ResourceSpec {
    pub fn kind(&self) -> ResourceKind {
        dispatch!(self, spec => kind_of(spec))
    }

    pub fn reference_sites(&self) -> Vec<ReferenceSite<'_>> {
        dispatch!(self, spec => spec.reference_sites())
    }

    pub fn check(&self) -> Result<(), String> {
        dispatch!(self, spec => spec.check())
    }

    pub fn tags(&self) -> Option<&Tags> {
        dispatch!(self, spec => spec.tags())
    }
}

/// A decoded, validated resource definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub api_version: Option<String>,
    pub metadata: Metadata,
    pub spec: ResourceSpec,
    pub source: SourceLocation,
}

impl Document {
    pub fn new(metadata: Metadata, spec: ResourceSpec, source: SourceLocation) -> Self {
        Self {
            api_version: None,
            metadata,
            spec,
            source,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.spec.kind()
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// `Kind/name` identifier used in reports.
    pub fn id(&self) -> String {
        format!("{}/{}", self.kind(), self.metadata.name)
    }

    pub fn reference_sites(&self) -> Vec<ReferenceSite<'_>> {
        self.spec.reference_sites()
    }

    /// Description from the spec when present, falling back to metadata.
    pub fn description(&self) -> Option<&str> {
        let from_spec = match &self.spec {
            ResourceSpec::Agent(s) => s.description.as_deref(),
            ResourceSpec::Lambda(_) => None,
            ResourceSpec::ActionGroup(s) => s.description.as_deref(),
            ResourceSpec::KnowledgeBase(s) => s.description.as_deref(),
            ResourceSpec::Guardrail(s) => s.description.as_deref(),
            ResourceSpec::Prompt(s) => s.description.as_deref(),
            ResourceSpec::IamRole(s) => s.description.as_deref(),
            ResourceSpec::CustomModule(s) => s.description.as_deref(),
            ResourceSpec::Association(s) => s.description.as_deref(),
            ResourceSpec::OpenSearchServerless(s) => s.description.as_deref(),
        };
        from_spec
            .filter(|d| !d.is_empty())
            .or_else(|| self.metadata.description.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_aliases_map_to_canonical_kinds() {
        assert_eq!(ResourceKind::from_kind("Function"), Some(ResourceKind::Lambda));
        assert_eq!(
            ResourceKind::from_kind("ExecutorBinding"),
            Some(ResourceKind::ActionGroup)
        );
        assert_eq!(
            ResourceKind::from_kind("VectorCollection"),
            Some(ResourceKind::OpenSearchServerless)
        );
        assert_eq!(
            ResourceKind::from_kind("KnowledgeBaseAssociation"),
            Some(ResourceKind::AgentKnowledgeBaseAssociation)
        );
        assert_eq!(ResourceKind::from_kind("agent"), None);
        assert_eq!(ResourceKind::from_kind("Database"), None);
    }

    #[test]
    fn test_kind_display_round_trips() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
        assert_eq!(ResourceKind::IamRole.to_string(), "IAMRole");
    }

    #[test]
    fn test_external_id_ignores_blank_values() {
        let reference = Reference::default();
        let blank = Some(String::new());
        let site = ReferenceSite::new("spec.role", &reference, ResourceKind::IamRole)
            .with_external("roleArn", &blank);
        assert!(site.external.is_none());

        let arn = Some("arn:aws:iam::123:role/x".to_string());
        let site = ReferenceSite::new("spec.role", &reference, ResourceKind::IamRole)
            .with_external("roleArn", &arn);
        assert_eq!(site.external.unwrap().value, "arn:aws:iam::123:role/x");
    }
}
