//! CustomModule spec: an arbitrary Terraform module wired into the tree.

use super::common::Tags;
use super::{Reference, ReferenceSite, ResourceKind, Spec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomModuleSpec {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Module inputs, passed through in declaration order.
    #[serde(default)]
    pub variables: serde_yaml::Mapping,
    #[serde(default)]
    pub depends_on: Vec<Reference>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Tags,
}

impl Spec for CustomModuleSpec {
    const KIND: ResourceKind = ResourceKind::CustomModule;

    fn reference_sites(&self) -> Vec<ReferenceSite<'_>> {
        self.depends_on
            .iter()
            .enumerate()
            .map(|(i, dep)| ReferenceSite::any(format!("spec.dependsOn[{}]", i), dep))
            .collect()
    }

    fn check(&self) -> Result<(), String> {
        if self.source.is_empty() {
            return Err("source is required".to_string());
        }
        if self.variables.keys().any(|k| !k.is_string()) {
            return Err("variables keys must be strings".to_string());
        }
        Ok(())
    }

    fn tags(&self) -> Option<&Tags> {
        Some(&self.tags)
    }
}
