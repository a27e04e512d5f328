//! AgentKnowledgeBaseAssociation projection.

use super::ir::Block;
use super::{invalid, sanitize_resource_name, Generator};
use crate::error::GenerationError;
use crate::model::{AssociationSpec, Document, ResourceKind};

const ASSOCIATION_MODULE: &str = "bedrock-agent-knowledge-base-association";

pub(crate) fn generate(
    gen: &Generator<'_>,
    doc: &Document,
    spec: &AssociationSpec,
) -> Result<Block, GenerationError> {
    let agent_id = gen
        .literal_or_interpolate(
            doc,
            "spec.agentName",
            &spec.agent_id,
            &spec.agent_name,
            ResourceKind::Agent,
            "agent_id",
        )?
        .ok_or_else(|| invalid(doc, "agentName or agentId is required"))?;
    let knowledge_base_id = gen
        .literal_or_interpolate(
            doc,
            "spec.knowledgeBaseName",
            &spec.knowledge_base_id,
            &spec.knowledge_base_name,
            ResourceKind::KnowledgeBase,
            "knowledge_base_id",
        )?
        .ok_or_else(|| invalid(doc, "knowledgeBaseName or knowledgeBaseId is required"))?;

    let mut block = gen.module_block(&sanitize_resource_name(doc.name()), ASSOCIATION_MODULE);
    block
        .body
        .set("association_name", doc.name())
        .set("agent_id", agent_id)
        .set("knowledge_base_id", knowledge_base_id)
        .set_str("description", &spec.description)
        .set_str("state", &spec.state);
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{add, config};
    use super::super::Generator;
    use crate::error::GenerationError;
    use crate::generator::ir::Value;
    use crate::registry::Registry;

    #[test]
    fn test_local_agent_and_external_knowledge_base() {
        let registry = Registry::new();
        add(&registry, "Agent", "support", "foundationModel: m\ninstruction: i\n");
        add(
            &registry,
            "AgentKnowledgeBaseAssociation",
            "support-docs",
            "agentName: support\nknowledgeBaseId: KB12345\nstate: ENABLED\n",
        );
        let tree = Generator::new(&registry, config()).unwrap().generate().unwrap();
        let block = tree.module("support_docs").unwrap();
        assert_eq!(
            block.body.attribute("agent_id"),
            Some(&Value::interpolation("module.support.agent_id"))
        );
        assert_eq!(block.body.attribute("knowledge_base_id"), Some(&Value::from("KB12345")));
        assert_eq!(block.body.attribute("state"), Some(&Value::from("ENABLED")));
    }

    #[test]
    fn test_missing_knowledge_base_is_unresolved() {
        let registry = Registry::new();
        add(
            &registry,
            "AgentKnowledgeBaseAssociation",
            "link",
            "agentId: AGENT1\nknowledgeBaseName: nowhere\n",
        );
        let err = Generator::new(&registry, config()).unwrap().generate().unwrap_err();
        let GenerationError::Failed { errors, .. } = err else {
            panic!("expected Failed");
        };
        assert!(matches!(
            &errors[0],
            GenerationError::UnresolvedReference { field, .. } if field == "spec.knowledgeBaseName"
        ));
    }
}
