//! AgentKnowledgeBaseAssociation spec.

use super::common::is_set;
use super::{Reference, ReferenceSite, ResourceKind, Spec};
use serde::{Deserialize, Serialize};

/// Links an agent to a knowledge base. Each side is either a local
/// reference or the id of something deployed elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssociationSpec {
    #[serde(default)]
    pub agent_name: Reference,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub knowledge_base_name: Reference,
    #[serde(default)]
    pub knowledge_base_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl Spec for AssociationSpec {
    const KIND: ResourceKind = ResourceKind::AgentKnowledgeBaseAssociation;

    fn reference_sites(&self) -> Vec<ReferenceSite<'_>> {
        vec![
            ReferenceSite::new("spec.agentName", &self.agent_name, ResourceKind::Agent)
                .with_external("agentId", &self.agent_id),
            ReferenceSite::new(
                "spec.knowledgeBaseName",
                &self.knowledge_base_name,
                ResourceKind::KnowledgeBase,
            )
            .with_external("knowledgeBaseId", &self.knowledge_base_id),
        ]
    }

    fn check(&self) -> Result<(), String> {
        if self.agent_name.is_empty() && !is_set(&self.agent_id) {
            return Err("agentName or agentId is required".to_string());
        }
        if self.knowledge_base_name.is_empty() && !is_set(&self.knowledge_base_id) {
            return Err("knowledgeBaseName or knowledgeBaseId is required".to_string());
        }
        if let Some(state) = self.state.as_deref() {
            if state != "ENABLED" && state != "DISABLED" {
                return Err(format!("state must be ENABLED or DISABLED, got '{}'", state));
            }
        }
        Ok(())
    }
}
