//! OpenSearchServerless spec: a vector collection plus its security policies.

use super::common::Tags;
use super::{ResourceKind, Spec};
use serde::{Deserialize, Serialize};

pub const DEFAULT_COLLECTION_TYPE: &str = "VECTORSEARCH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OpenSearchServerlessSpec {
    #[serde(default)]
    pub collection_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub r#type: Option<String>,
    #[serde(default)]
    pub encryption_policy: Option<EncryptionPolicy>,
    #[serde(default)]
    pub network_policy: Option<NetworkPolicy>,
    #[serde(default)]
    pub access_policy: Option<AccessPolicy>,
    #[serde(default)]
    pub vector_index: Option<VectorIndex>,
    #[serde(default)]
    pub tags: Tags,
}

impl OpenSearchServerlessSpec {
    pub fn collection_type(&self) -> &str {
        self.r#type
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_COLLECTION_TYPE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EncryptionPolicy {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub r#type: Option<String>,
    #[serde(default)]
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NetworkPolicy {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub r#type: Option<String>,
    #[serde(default)]
    pub access: Vec<NetworkAccess>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NetworkAccess {
    #[serde(default, rename = "sourceVPCEs")]
    pub source_vpces: Vec<String>,
    #[serde(default)]
    pub source_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AccessPolicy {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub r#type: Option<String>,
    #[serde(default)]
    pub principals: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub auto_configure_for_bedrock: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VectorIndex {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub field_mapping: VectorFieldMapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VectorFieldMapping {
    #[serde(default = "default_vector_field")]
    pub vector_field: String,
    #[serde(default = "default_text_field")]
    pub text_field: String,
    #[serde(default = "default_metadata_field")]
    pub metadata_field: String,
}

fn default_vector_field() -> String {
    "vector".to_string()
}

fn default_text_field() -> String {
    "text".to_string()
}

fn default_metadata_field() -> String {
    "metadata".to_string()
}

impl Default for VectorFieldMapping {
    fn default() -> Self {
        Self {
            vector_field: default_vector_field(),
            text_field: default_text_field(),
            metadata_field: default_metadata_field(),
        }
    }
}

impl Spec for OpenSearchServerlessSpec {
    const KIND: ResourceKind = ResourceKind::OpenSearchServerless;

    fn check(&self) -> Result<(), String> {
        if self.collection_name.is_empty() {
            return Err("collectionName is required".to_string());
        }
        // Collection names: 3-32 chars, lowercase letters, digits and hyphens.
        let valid = self.collection_name.len() >= 3
            && self.collection_name.len() <= 32
            && self
                .collection_name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(format!(
                "collectionName '{}' must be 3-32 lowercase letters, digits or hyphens",
                self.collection_name
            ));
        }
        Ok(())
    }

    fn tags(&self) -> Option<&Tags> {
        Some(&self.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_mapping_defaults() {
        let yaml = "collectionName: docs\nvectorIndex:\n  name: docs-index\n  fieldMapping: {}\n";
        let spec: OpenSearchServerlessSpec = serde_yaml::from_str(yaml).unwrap();
        let mapping = &spec.vector_index.as_ref().unwrap().field_mapping;
        assert_eq!(mapping.vector_field, "vector");
        assert_eq!(mapping.metadata_field, "metadata");
        assert_eq!(spec.collection_type(), "VECTORSEARCH");
        assert!(spec.check().is_ok());
    }

    #[test]
    fn test_uppercase_collection_name_fails_check() {
        let spec: OpenSearchServerlessSpec =
            serde_yaml::from_str("collectionName: Docs_Collection\n").unwrap();
        assert!(spec.check().is_err());
    }
}
