//! Terraform generation
//!
//! Projects every registered document into blocks of a [`ModuleTree`] and
//! serializes the tree as HCL (and optionally Terraform JSON). References
//! are resolved through the registry; a reference that does not resolve,
//! names a document of another kind, or is paired with an explicit ARN or
//! id is an error, never a silent literal. Every module label must be
//! unique across the tree. All per-document failures are collected, and
//! nothing is written unless every document projected.

pub mod action_group;
pub mod agent;
pub mod association;
pub mod context;
pub mod custom_module;
pub mod guardrail;
pub mod hcl;
pub mod iam_role;
pub mod ir;
pub mod json;
pub mod knowledge_base;
pub mod lambda;
pub mod opensearch;
pub mod prompt;

pub use context::GenerationContext;
pub use ir::{Block, Body, Fields, ModuleTree, Value};

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::model::{
    Document, ExternalId, Reference, ReferenceSite, ReferenceTarget, ResourceKind, ResourceSpec,
    Timeouts,
};
use crate::registry::Registry;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

pub const HCL_FILE: &str = "main.tf";
pub const JSON_FILE: &str = "main.tf.json";
pub const MANAGED_BY: &str = "bedrock-forge";

const AWS_PROVIDER_SOURCE: &str = "hashicorp/aws";
const AWS_PROVIDER_VERSION: &str = "~> 5.0";
const TERRAFORM_VERSION: &str = ">= 1.0";

/// Kinds in emission order. Auto-generated agent roles precede all of them.
pub const GENERATION_ORDER: [ResourceKind; 10] = [
    ResourceKind::IamRole,
    ResourceKind::Guardrail,
    ResourceKind::Prompt,
    ResourceKind::Lambda,
    ResourceKind::OpenSearchServerless,
    ResourceKind::KnowledgeBase,
    ResourceKind::Agent,
    ResourceKind::ActionGroup,
    ResourceKind::AgentKnowledgeBaseAssociation,
    ResourceKind::CustomModule,
];

/// Files written by [`Generator::write`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFiles {
    pub output_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub blocks: usize,
}

pub struct Generator<'a> {
    registry: &'a Registry,
    config: GeneratorConfig,
    context: GenerationContext,
    require_artifacts: bool,
}

impl<'a> Generator<'a> {
    pub fn new(registry: &'a Registry, config: GeneratorConfig) -> Result<Self, GenerationError> {
        if config.module_registry.trim().is_empty() {
            return Err(GenerationError::MissingModuleRegistry);
        }
        Ok(Self {
            registry,
            config,
            context: GenerationContext::default(),
            require_artifacts: false,
        })
    }

    pub fn with_context(mut self, context: GenerationContext) -> Self {
        self.context = context;
        self
    }

    /// Treat a failed Lambda package as an error instead of a warning.
    pub fn require_artifacts(mut self, required: bool) -> Self {
        self.require_artifacts = required;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    pub fn context(&self) -> &GenerationContext {
        &self.context
    }

    pub(crate) fn artifacts_required(&self) -> bool {
        self.require_artifacts
    }

    pub fn generate(&self) -> Result<ModuleTree, GenerationError> {
        let mut tree = ModuleTree::new();
        tree.push(self.terraform_block());
        tree.push(self.provider_block());
        tree.extend(self.variable_blocks());

        let mut errors = Vec::new();
        let mut labels = LabelClaims::default();
        let agents = self.registry.get_resources_by_kind(ResourceKind::Agent);

        for doc in agents.values() {
            if let ResourceSpec::Agent(spec) = &doc.spec {
                if spec.needs_auto_role() {
                    match agent::auto_role(self, doc, spec) {
                        Ok(block) => labels.push(&mut tree, &mut errors, doc, vec![block]),
                        Err(e) => errors.push(e),
                    }
                }
            }
        }

        for kind in GENERATION_ORDER {
            for doc in self.registry.get_resources_by_kind(kind).values() {
                match self.project(doc) {
                    Ok(blocks) => {
                        debug!(resource = %doc.id(), blocks = blocks.len(), "Projected resource");
                        labels.push(&mut tree, &mut errors, doc, blocks);
                    }
                    Err(e) => {
                        error!(resource = %doc.id(), error = %e, "Failed to generate resource");
                        errors.push(e);
                    }
                }
            }
        }

        tree.extend(self.output_blocks(agents.values()));

        if !errors.is_empty() {
            return Err(GenerationError::Failed {
                count: errors.len(),
                errors,
            });
        }
        info!(blocks = tree.len(), modules = tree.module_labels().len(), "Generated module tree");
        Ok(tree)
    }

    fn project(&self, doc: &Document) -> Result<Vec<Block>, GenerationError> {
        match &doc.spec {
            ResourceSpec::Agent(spec) => agent::generate(self, doc, spec),
            ResourceSpec::Lambda(spec) => lambda::generate(self, doc, spec).map(|b| vec![b]),
            ResourceSpec::ActionGroup(spec) => {
                action_group::generate(self, doc, spec).map(|b| vec![b])
            }
            ResourceSpec::KnowledgeBase(spec) => {
                knowledge_base::generate(self, doc, spec).map(|b| vec![b])
            }
            ResourceSpec::Guardrail(spec) => guardrail::generate(self, doc, spec).map(|b| vec![b]),
            ResourceSpec::Prompt(spec) => prompt::generate(self, doc, spec).map(|b| vec![b]),
            ResourceSpec::IamRole(spec) => iam_role::generate(self, doc, spec).map(|b| vec![b]),
            ResourceSpec::CustomModule(spec) => {
                custom_module::generate(self, doc, spec).map(|b| vec![b])
            }
            ResourceSpec::Association(spec) => {
                association::generate(self, doc, spec).map(|b| vec![b])
            }
            ResourceSpec::OpenSearchServerless(spec) => opensearch::generate(self, doc, spec),
        }
    }

    /// Write `main.tf`, plus `main.tf.json` when JSON output is enabled.
    pub fn write(&self, tree: &ModuleTree, output_dir: &Path) -> Result<GeneratedFiles, GenerationError> {
        fs::create_dir_all(output_dir).map_err(|e| GenerationError::Io {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        let mut files = Vec::new();
        let hcl_path = output_dir.join(HCL_FILE);
        write_file(&hcl_path, &hcl::render(tree))?;
        files.push(hcl_path);

        if self.config.emit_json {
            let json_path = output_dir.join(JSON_FILE);
            write_file(&json_path, &json::render(tree)?)?;
            files.push(json_path);
        }

        info!(dir = %output_dir.display(), files = files.len(), "Wrote Terraform configuration");
        Ok(GeneratedFiles {
            output_dir: output_dir.to_path_buf(),
            files,
            blocks: tree.len(),
        })
    }

    /// `{registry}//modules/{module}`, pinned with `?ref=` when a version is
    /// configured.
    pub fn module_source(&self, module: &str) -> String {
        let registry = self.config.module_registry.trim_end_matches('/');
        let version = self.config.module_version.trim();
        if version.is_empty() {
            format!("{}//modules/{}", registry, module)
        } else {
            format!("{}//modules/{}?ref={}", registry, module, version)
        }
    }

    /// A `module` block whose first attribute is its source.
    pub(crate) fn module_block(&self, label: &str, module: &str) -> Block {
        let mut block = Block::module(label);
        block.body.set("source", self.module_source(module));
        block
    }

    /// Check the reference at `field` of `owner` the way dependency
    /// validation does. The owner's declared site supplies the external id
    /// paired with the field; `literal` stands in for it when the site
    /// declares none. `Ok(None)` means the reference is unset.
    pub(crate) fn check_site(
        &self,
        owner: &Document,
        field: &str,
        reference: &Reference,
        target: ReferenceTarget,
        literal: Option<&str>,
    ) -> Result<Option<Arc<Document>>, GenerationError> {
        let declared = owner.reference_sites().into_iter().find(|s| s.field == field);
        let mut site = ReferenceSite {
            field: field.to_string(),
            reference,
            target: declared.as_ref().map_or(target, |s| s.target),
            external: declared.and_then(|s| s.external),
        };
        if site.external.is_none() {
            site.external = literal.map(|value| ExternalId {
                field: "an explicit identifier",
                value,
            });
        }
        self.registry
            .check_reference(owner, &site)
            .map_err(GenerationError::from)
    }

    /// Resolve `reference` to a `target` document.
    pub(crate) fn resolve(
        &self,
        owner: &Document,
        field: &str,
        reference: &Reference,
        target: ResourceKind,
    ) -> Result<Arc<Document>, GenerationError> {
        let target = ReferenceTarget::Kind(target);
        self.check_site(owner, field, reference, target, None)?
            .ok_or_else(|| unresolved(owner, field, target, reference))
    }

    /// `${module.<target>.<output>}` for a reference that must resolve.
    pub(crate) fn interpolate(
        &self,
        owner: &Document,
        field: &str,
        reference: &Reference,
        target: ResourceKind,
        output: &str,
    ) -> Result<Value, GenerationError> {
        let resolved = self.resolve(owner, field, reference, target)?;
        Ok(module_output(resolved.name(), output))
    }

    /// The interpolation of `reference` when set, else the literal; `None`
    /// when neither is given. Setting both is an ambiguity error.
    pub(crate) fn literal_or_interpolate(
        &self,
        owner: &Document,
        field: &str,
        literal: &Option<String>,
        reference: &Reference,
        target: ResourceKind,
        output: &str,
    ) -> Result<Option<Value>, GenerationError> {
        let literal = literal.as_deref().filter(|v| !v.trim().is_empty());
        if reference.is_empty() {
            return Ok(literal.map(Value::from));
        }
        let target = ReferenceTarget::Kind(target);
        let resolved = self
            .check_site(owner, field, reference, target, literal)?
            .ok_or_else(|| unresolved(owner, field, target, reference))?;
        Ok(Some(module_output(resolved.name(), output)))
    }

    fn terraform_block(&self) -> Block {
        let mut providers = Block::new("required_providers", &[]);
        providers.body.set(
            "aws",
            Fields::new()
                .with("source", AWS_PROVIDER_SOURCE)
                .with("version", AWS_PROVIDER_VERSION),
        );
        let mut terraform = Block::new("terraform", &[]);
        terraform.body.push_block(providers);
        terraform.body.set("required_version", TERRAFORM_VERSION);
        terraform
    }

    fn provider_block(&self) -> Block {
        let mut provider = Block::new("provider", &["aws"]);
        provider.body.set_str("region", &self.config.region);
        let mut default_tags = Block::new("default_tags", &[]);
        default_tags.body.set(
            "tags",
            Fields::new()
                .with("Environment", self.config.environment.as_str())
                .with("ManagedBy", MANAGED_BY)
                .with("Project", self.config.project_name.as_str()),
        );
        provider.body.push_block(default_tags);
        provider
    }

    fn variable_blocks(&self) -> Vec<Block> {
        let mut project = Block::new("variable", &["project_name"]);
        project
            .body
            .set("description", "Name of the project")
            .set("type", Value::traversal("string"))
            .set("default", self.config.project_name.as_str());
        let mut environment = Block::new("variable", &["environment"]);
        environment
            .body
            .set("description", "Environment name")
            .set("type", Value::traversal("string"))
            .set("default", self.config.environment.as_str());
        vec![project, environment]
    }

    fn output_blocks<'d>(&self, agents: impl Iterator<Item = &'d Arc<Document>>) -> Vec<Block> {
        let mut blocks = Vec::new();
        for doc in agents {
            let label = sanitize_resource_name(doc.name());
            let id_label = format!("{}_agent_id", label);
            let arn_label = format!("{}_agent_arn", label);
            let mut id = Block::new("output", &[id_label.as_str()]);
            id.body
                .set("description", format!("ID of the {} agent", doc.name()))
                .set("value", module_output(doc.name(), "agent_id"));
            let mut arn = Block::new("output", &[arn_label.as_str()]);
            arn.body
                .set("description", format!("ARN of the {} agent", doc.name()))
                .set("value", module_output(doc.name(), "agent_arn"));
            blocks.push(id);
            blocks.push(arn);
        }
        blocks
    }
}

/// Terraform-safe label: lowercase, every character outside `[a-z0-9_]`
/// becomes `_`, and a leading digit (or an empty name) gets a `_` prefix.
pub fn sanitize_resource_name(name: &str) -> String {
    let mut label: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if label.is_empty() || label.starts_with(|c: char| c.is_ascii_digit()) {
        label.insert(0, '_');
    }
    label
}

/// Labels claimed so far, keyed by block type and labels, with the id of
/// the document that produced each.
#[derive(Default)]
struct LabelClaims {
    owners: HashMap<(String, Vec<String>), String>,
}

impl LabelClaims {
    /// Append `blocks` for `doc`; a label another document already claimed
    /// is reported instead of emitted.
    fn push(
        &mut self,
        tree: &mut ModuleTree,
        errors: &mut Vec<GenerationError>,
        doc: &Document,
        blocks: Vec<Block>,
    ) {
        let id = doc.id();
        for block in blocks {
            let key = (block.block_type.clone(), block.labels.clone());
            match self.owners.get(&key) {
                Some(first) => {
                    error!(label = %block.labels.join("."), first = %first, second = %id, "Duplicate block label");
                    errors.push(GenerationError::DuplicateLabel {
                        block_type: block.block_type.clone(),
                        label: block.labels.join("."),
                        first: first.clone(),
                        second: id.clone(),
                    });
                }
                None => {
                    self.owners.insert(key, id.clone());
                    tree.push(block);
                }
            }
        }
    }
}

/// `${module.<sanitized name>.<output>}`.
pub(crate) fn module_output(name: &str, output: &str) -> Value {
    Value::interpolation(format!("module.{}.{}", sanitize_resource_name(name), output))
}

/// `timeouts` object with only the phases that were given.
pub(crate) fn timeouts(timeouts: &Timeouts) -> Option<Fields> {
    if timeouts.is_empty() {
        return None;
    }
    let mut fields = Fields::new();
    fields
        .set_str("create", &timeouts.create)
        .set_str("update", &timeouts.update)
        .set_str("delete", &timeouts.delete);
    Some(fields)
}

pub(crate) fn unresolved(
    owner: &Document,
    field: &str,
    target: ReferenceTarget,
    reference: &Reference,
) -> GenerationError {
    GenerationError::UnresolvedReference {
        kind: owner.kind(),
        name: owner.name().to_string(),
        field: field.to_string(),
        target,
        reference: reference.name().to_string(),
    }
}

pub(crate) fn invalid(owner: &Document, message: impl Into<String>) -> GenerationError {
    GenerationError::InvalidSpec {
        kind: owner.kind(),
        name: owner.name().to_string(),
        message: message.into(),
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), GenerationError> {
    fs::write(path, content).map_err(|e| GenerationError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::GeneratorConfig;
    use crate::parser::YamlParser;
    use crate::registry::Registry;
    use std::path::PathBuf;

    pub fn config() -> GeneratorConfig {
        GeneratorConfig {
            module_registry: "git::https://example.com/modules".to_string(),
            module_version: "v1.0.0".to_string(),
            ..GeneratorConfig::default()
        }
    }

    /// Parse a `kind` document whose spec is `spec_yaml` and register it.
    pub fn add(registry: &Registry, kind: &str, name: &str, spec_yaml: &str) {
        let spec: String = spec_yaml
            .lines()
            .map(|line| format!("  {}\n", line))
            .collect();
        let text = format!("kind: {}\nmetadata:\n  name: {}\nspec:\n{}", kind, name, spec);
        let path = PathBuf::from(format!("defs/{}/resource.yml", name));
        let parsed = YamlParser::new().parse_str(&text, &path);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        for doc in parsed.documents {
            registry.add_resource(doc).unwrap();
        }
    }
}
