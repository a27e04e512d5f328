//! CustomModule projection: an arbitrary module call wired into the tree.

use super::ir::{yaml_key, Block, Value};
use super::opensearch::collection_label;
use super::{invalid, sanitize_resource_name, unresolved, Generator};
use crate::error::GenerationError;
use crate::model::{CustomModuleSpec, Document, ReferenceTarget, ResourceKind};
use tracing::debug;

/// Attributes Terraform reserves on a module block.
const META_ARGUMENTS: [&str; 6] = ["source", "version", "depends_on", "count", "for_each", "providers"];

pub(crate) fn generate(
    gen: &Generator<'_>,
    doc: &Document,
    spec: &CustomModuleSpec,
) -> Result<Block, GenerationError> {
    let mut block = Block::module(sanitize_resource_name(doc.name()));
    let version = spec.version.as_deref().filter(|v| !v.is_empty());
    match version {
        Some(version) if is_git_source(&spec.source) => {
            block.body.set("source", format!("{}?ref={}", spec.source, version));
        }
        Some(version) if is_registry_source(&spec.source) => {
            block
                .body
                .set("source", spec.source.as_str())
                .set("version", version);
        }
        Some(version) => {
            debug!(module = %doc.name(), %version, "Ignoring version for local module source");
            block.body.set("source", spec.source.as_str());
        }
        None => {
            block.body.set("source", spec.source.as_str());
        }
    }

    for (key, value) in &spec.variables {
        let name = yaml_key(key)
            .ok_or_else(|| invalid(doc, "variables keys must be strings"))?;
        if META_ARGUMENTS.contains(&name.as_str()) {
            return Err(invalid(
                doc,
                format!("variable '{}' collides with a module meta-argument", name),
            ));
        }
        block.body.set(name, Value::from_yaml(value));
    }

    let mut depends_on = Vec::with_capacity(spec.depends_on.len());
    for (i, dependency) in spec.depends_on.iter().enumerate() {
        if dependency.is_empty() {
            continue;
        }
        let field = format!("spec.dependsOn[{}]", i);
        let target = gen
            .check_site(doc, &field, dependency, ReferenceTarget::Any, None)?
            .ok_or_else(|| unresolved(doc, &field, ReferenceTarget::Any, dependency))?;
        let address = match target.kind() {
            ResourceKind::OpenSearchServerless => format!(
                "aws_opensearchserverless_collection.{}",
                collection_label(target.name())
            ),
            _ => format!("module.{}", sanitize_resource_name(target.name())),
        };
        depends_on.push(Value::traversal(address));
    }
    block.body.set_non_empty("depends_on", depends_on);
    Ok(block)
}

fn is_git_source(source: &str) -> bool {
    source.starts_with("git::") || source.starts_with("git@") || source.contains(".git")
}

/// `namespace/name/provider` registry address.
fn is_registry_source(source: &str) -> bool {
    !is_git_source(source)
        && !source.contains("::")
        && !source.starts_with('.')
        && !source.starts_with('/')
        && source.split('/').count() == 3
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{add, config};
    use super::super::Generator;
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn test_source_kinds() {
        assert!(is_git_source("git::https://example.com/cache.git"));
        assert!(is_registry_source("terraform-aws-modules/vpc/aws"));
        assert!(!is_registry_source("./modules/cache"));
        assert!(!is_registry_source("git::https://example.com/a/b"));
    }

    #[test]
    fn test_module_call() {
        let registry = Registry::new();
        add(&registry, "Agent", "support", "foundationModel: m\ninstruction: i\n");
        add(&registry, "OpenSearchServerless", "docs", "collectionName: docs-vectors\n");
        add(
            &registry,
            "CustomModule",
            "cache",
            "source: terraform-aws-modules/elasticache/aws\nversion: 1.2.0\nvariables:\n  node_type: cache.t3.micro\n  replicas: 2\ndependsOn: [support, docs]\n",
        );
        let tree = Generator::new(&registry, config()).unwrap().generate().unwrap();
        let block = tree.module("cache").unwrap();
        assert_eq!(
            block.body.attribute("source"),
            Some(&Value::from("terraform-aws-modules/elasticache/aws"))
        );
        assert_eq!(block.body.attribute("version"), Some(&Value::from("1.2.0")));
        assert_eq!(block.body.attribute("replicas"), Some(&Value::from(2u32)));
        assert_eq!(
            block.body.attribute("depends_on"),
            Some(&Value::List(vec![
                Value::traversal("module.support"),
                Value::traversal("aws_opensearchserverless_collection.docs"),
            ]))
        );
    }

    #[test]
    fn test_git_source_pins_ref_and_rejects_meta_arguments() {
        let registry = Registry::new();
        add(
            &registry,
            "CustomModule",
            "pinned",
            "source: git::https://example.com/cache.git\nversion: v2\n",
        );
        let tree = Generator::new(&registry, config()).unwrap().generate().unwrap();
        assert_eq!(
            tree.module("pinned").unwrap().body.attribute("source"),
            Some(&Value::from("git::https://example.com/cache.git?ref=v2"))
        );

        let registry = Registry::new();
        add(
            &registry,
            "CustomModule",
            "bad",
            "source: ./modules/x\nvariables:\n  count: 2\n",
        );
        assert!(Generator::new(&registry, config()).unwrap().generate().is_err());
    }
}
