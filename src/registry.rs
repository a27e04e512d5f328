//! Resource registry
//!
//! Indexes documents by `(kind, name)`. The registry is filled once per run,
//! then only read by validation and generation. [`Registry::check_reference`]
//! is the single resolution rule both of them use.

use crate::error::{DependencyError, DuplicateResourceError};
use crate::model::{Document, Reference, ReferenceSite, ReferenceTarget, ResourceKind};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

type KindIndex = BTreeMap<String, Arc<Document>>;

/// Thread-safe `(kind, name)` index of loaded documents.
#[derive(Debug, Default)]
pub struct Registry {
    resources: RwLock<HashMap<ResourceKind, KindIndex>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document. The first registration of an identity wins; a
    /// later one is rejected and left out.
    pub fn add_resource(&self, document: Document) -> Result<Arc<Document>, DuplicateResourceError> {
        let kind = document.kind();
        let mut resources = self.resources.write();
        let index = resources.entry(kind).or_default();
        if let Some(existing) = index.get(document.name()) {
            warn!(
                kind = %kind,
                name = %document.name(),
                existing = %existing.source.file_path.display(),
                duplicate = %document.source.file_path.display(),
                "Duplicate resource"
            );
            return Err(DuplicateResourceError {
                kind,
                name: document.name().to_string(),
                existing: existing.source.file_path.clone(),
                duplicate: document.source.file_path.clone(),
            });
        }
        let name = document.name().to_string();
        debug!(kind = %kind, name = %name, "Registered resource");
        let document = Arc::new(document);
        index.insert(name, Arc::clone(&document));
        Ok(document)
    }

    /// Register documents in order, returning every duplicate rejected.
    pub fn add_all(&self, documents: impl IntoIterator<Item = Document>) -> Vec<DuplicateResourceError> {
        documents
            .into_iter()
            .filter_map(|doc| self.add_resource(doc).err())
            .collect()
    }

    pub fn get_resource(&self, kind: ResourceKind, name: &str) -> Option<Arc<Document>> {
        self.resources
            .read()
            .get(&kind)
            .and_then(|index| index.get(name))
            .cloned()
    }

    /// Copy of one kind's index, ordered by name.
    pub fn get_resources_by_kind(&self, kind: ResourceKind) -> BTreeMap<String, Arc<Document>> {
        self.resources
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Every document, kinds in listing order and names sorted within a kind.
    pub fn get_all_resources(&self) -> Vec<Arc<Document>> {
        let resources = self.resources.read();
        ResourceKind::ALL
            .iter()
            .filter_map(|kind| resources.get(kind))
            .flat_map(|index| index.values().cloned())
            .collect()
    }

    pub fn list_resource_names(&self, kind: ResourceKind) -> Vec<String> {
        self.resources
            .read()
            .get(&kind)
            .map(|index| index.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_resource_count(&self, kind: ResourceKind) -> usize {
        self.resources
            .read()
            .get(&kind)
            .map(|index| index.len())
            .unwrap_or(0)
    }

    pub fn get_total_resource_count(&self) -> usize {
        self.resources.read().values().map(|index| index.len()).sum()
    }

    pub fn has_resource(&self, kind: ResourceKind, name: &str) -> bool {
        self.get_resource(kind, name).is_some()
    }

    pub fn clear(&self) {
        self.resources.write().clear();
    }

    /// Look up the target of a reference of a known kind.
    pub fn resolve(&self, reference: &Reference, kind: ResourceKind) -> Option<Arc<Document>> {
        if reference.is_empty() {
            return None;
        }
        self.get_resource(kind, reference.name())
    }

    /// Look up a reference that may point at any kind. When several kinds
    /// share the name, the first in listing order wins.
    pub fn resolve_any(&self, reference: &Reference) -> Option<Arc<Document>> {
        if reference.is_empty() {
            return None;
        }
        let resources = self.resources.read();
        ResourceKind::ALL
            .iter()
            .filter_map(|kind| resources.get(kind))
            .find_map(|index| index.get(reference.name()).cloned())
    }

    /// Resolve one reference site of `owner`.
    ///
    /// Returns `Ok(None)` when the site is unset (including when only its
    /// external identifier is populated) and the target document otherwise.
    pub fn check_reference(
        &self,
        owner: &Document,
        site: &ReferenceSite<'_>,
    ) -> Result<Option<Arc<Document>>, DependencyError> {
        if site.reference.is_empty() {
            return Ok(None);
        }
        if let Some(external) = site.external {
            return Err(DependencyError::AmbiguousReference {
                kind: owner.kind(),
                name: owner.name().to_string(),
                field: site.field.clone(),
                reference: site.reference.name().to_string(),
                external: external.field.to_string(),
            });
        }
        let found = match site.target {
            ReferenceTarget::Kind(kind) => self.resolve(site.reference, kind),
            ReferenceTarget::Any => self.resolve_any(site.reference),
        };
        if let Some(target) = found {
            return Ok(Some(target));
        }
        if let ReferenceTarget::Kind(_) = site.target {
            if let Some(other) = self.resolve_any(site.reference) {
                return Err(DependencyError::WrongKind {
                    kind: owner.kind(),
                    name: owner.name().to_string(),
                    field: site.field.clone(),
                    target: site.target,
                    reference: site.reference.name().to_string(),
                    found: other.kind(),
                });
            }
        }
        Err(DependencyError::Unresolved {
            kind: owner.kind(),
            name: owner.name().to_string(),
            field: site.field.clone(),
            target: site.target,
            reference: site.reference.name().to_string(),
        })
    }

    /// Check every reference of every document. Exhaustive: all broken
    /// references are reported, in listing order.
    pub fn validate_dependencies(&self) -> Vec<DependencyError> {
        let mut errors = Vec::new();
        for document in self.get_all_resources() {
            for site in document.reference_sites() {
                if let Err(e) = self.check_reference(&document, &site) {
                    errors.push(e);
                }
            }
        }
        info!(
            resources = self.get_total_resource_count(),
            errors = errors.len(),
            "Validated dependencies"
        );
        errors
    }

    /// Number of distinct documents with at least one dependency error.
    pub fn invalid_document_count(errors: &[DependencyError]) -> usize {
        let mut owners: Vec<(ResourceKind, &str)> = errors.iter().map(|e| e.owner()).collect();
        owners.sort();
        owners.dedup();
        owners.len()
    }

    /// Per-kind counts in listing order, skipping empty kinds.
    pub fn counts(&self) -> Vec<(ResourceKind, usize)> {
        ResourceKind::ALL
            .iter()
            .map(|kind| (*kind, self.get_resource_count(*kind)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::action_group::ActionGroupExecutor;
    use crate::model::agent::GuardrailBinding;
    use crate::model::{
        ActionGroupSpec, AgentSpec, CustomModuleSpec, GuardrailSpec, Metadata, ResourceSpec,
        SourceLocation,
    };
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn doc(name: &str, spec: ResourceSpec, file: &str) -> Document {
        Document::new(
            Metadata {
                name: name.to_string(),
                ..Default::default()
            },
            spec,
            SourceLocation {
                file_path: PathBuf::from(file),
                document_index: 0,
            },
        )
    }

    fn agent(name: &str, guardrail: Option<&str>) -> Document {
        let spec = AgentSpec {
            foundation_model: "m".to_string(),
            instruction: "i".to_string(),
            guardrail: guardrail.map(|g| GuardrailBinding {
                name: Reference::new(g),
                ..Default::default()
            }),
            ..Default::default()
        };
        doc(name, ResourceSpec::Agent(spec), "agents.yml")
    }

    fn guardrail(name: &str) -> Document {
        doc(
            name,
            ResourceSpec::Guardrail(GuardrailSpec::default()),
            "guardrails.yml",
        )
    }

    fn action_group(name: &str, agent: &str, lambda: Option<&str>, arn: Option<&str>) -> Document {
        let spec = ActionGroupSpec {
            agent_id: Reference::new(agent),
            action_group_executor: Some(ActionGroupExecutor {
                lambda: lambda.map(Reference::new).unwrap_or_default(),
                lambda_arn: arn.map(str::to_string),
                custom_control: None,
            }),
            ..Default::default()
        };
        doc(name, ResourceSpec::ActionGroup(spec), "groups.yml")
    }

    #[test]
    fn test_duplicate_keeps_first_registration() {
        let registry = Registry::new();
        registry.add_resource(agent("a", None)).unwrap();
        let mut second = agent("a", Some("g"));
        second.source.file_path = PathBuf::from("other.yml");
        let err = registry.add_resource(second).unwrap_err();
        assert_eq!(err.kind, ResourceKind::Agent);
        assert_eq!(err.existing, PathBuf::from("agents.yml"));
        assert_eq!(err.duplicate, PathBuf::from("other.yml"));
        assert_eq!(registry.get_resource_count(ResourceKind::Agent), 1);
        let kept = registry.get_resource(ResourceKind::Agent, "a").unwrap();
        match &kept.spec {
            ResourceSpec::Agent(spec) => assert!(spec.guardrail.is_none()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_same_name_different_kind_is_allowed() {
        let registry = Registry::new();
        registry.add_resource(agent("shared", None)).unwrap();
        registry.add_resource(guardrail("shared")).unwrap();
        assert_eq!(registry.get_total_resource_count(), 2);
        assert!(registry.has_resource(ResourceKind::Guardrail, "shared"));
    }

    #[test]
    fn test_validation_reports_every_unresolved_reference() {
        let registry = Registry::new();
        registry.add_resource(agent("a1", Some("missing-1"))).unwrap();
        registry.add_resource(agent("a2", Some("missing-2"))).unwrap();
        registry.add_resource(agent("a3", Some("present"))).unwrap();
        registry.add_resource(guardrail("present")).unwrap();
        registry
            .add_resource(action_group("ag", "ghost", Some("no-fn"), None))
            .unwrap();

        let errors = registry.validate_dependencies();
        assert_eq!(errors.len(), 4);
        assert_eq!(Registry::invalid_document_count(&errors), 3);
        let fields: Vec<_> = errors
            .iter()
            .map(|e| match e {
                DependencyError::Unresolved { field, .. } => field.clone(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            fields,
            vec![
                "spec.guardrail.name",
                "spec.guardrail.name",
                "spec.agentId",
                "spec.actionGroupExecutor.lambda",
            ]
        );
    }

    #[test]
    fn test_external_arn_bypasses_resolution() {
        let registry = Registry::new();
        registry.add_resource(agent("support", None)).unwrap();
        registry
            .add_resource(action_group(
                "ag",
                "support",
                None,
                Some("arn:aws:lambda:us-east-1:1:function:x"),
            ))
            .unwrap();
        assert!(registry.validate_dependencies().is_empty());
    }

    #[test]
    fn test_reference_and_external_together_is_ambiguous() {
        let registry = Registry::new();
        registry.add_resource(agent("support", None)).unwrap();
        registry
            .add_resource(action_group(
                "ag",
                "support",
                Some("fn"),
                Some("arn:aws:lambda:us-east-1:1:function:x"),
            ))
            .unwrap();
        let errors = registry.validate_dependencies();
        assert!(matches!(
            errors.as_slice(),
            [DependencyError::AmbiguousReference { .. }]
        ));
    }

    #[test]
    fn test_wrong_kind_is_distinguished() {
        let registry = Registry::new();
        registry.add_resource(agent("a", Some("actually-an-agent"))).unwrap();
        registry.add_resource(agent("actually-an-agent", None)).unwrap();
        let errors = registry.validate_dependencies();
        match &errors[0] {
            DependencyError::WrongKind { found, .. } => assert_eq!(*found, ResourceKind::Agent),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_depends_on_resolves_any_kind() {
        let registry = Registry::new();
        registry.add_resource(guardrail("g")).unwrap();
        let spec = CustomModuleSpec {
            source: "./modules/x".to_string(),
            depends_on: vec![Reference::new("g"), Reference::new("nothing")],
            ..Default::default()
        };
        registry
            .add_resource(doc("custom", ResourceSpec::CustomModule(spec), "c.yml"))
            .unwrap();
        let errors = registry.validate_dependencies();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("resource 'nothing' not found"));
    }

    #[test]
    fn test_get_resources_by_kind_is_a_copy() {
        let registry = Registry::new();
        registry.add_resource(guardrail("g1")).unwrap();
        let snapshot = registry.get_resources_by_kind(ResourceKind::Guardrail);
        registry.add_resource(guardrail("g2")).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            registry.list_resource_names(ResourceKind::Guardrail),
            vec!["g1".to_string(), "g2".to_string()]
        );
        registry.clear();
        assert_eq!(registry.get_total_resource_count(), 0);
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(Registry::new());
        let accepted = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                let accepted = Arc::clone(&accepted);
                thread::spawn(move || {
                    for i in 0..50 {
                        // Half the names collide across threads.
                        let name = format!("g{}", if i % 2 == 0 { i } else { i * 100 + t });
                        if registry.add_resource(guardrail(&name)).is_ok() {
                            accepted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let count = registry.get_resource_count(ResourceKind::Guardrail);
        assert_eq!(count, accepted.load(Ordering::SeqCst));
        assert_eq!(count, 25 + 25 * 8);
    }
}
