//! KnowledgeBase spec.

use super::common::{is_set, Tags};
use super::{Reference, ReferenceSite, ResourceKind, Spec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KnowledgeBaseSpec {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub knowledge_base_configuration: Option<KnowledgeBaseConfiguration>,
    #[serde(default)]
    pub storage_configuration: Option<StorageConfiguration>,
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KnowledgeBaseConfiguration {
    #[serde(default, rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub vector_knowledge_base_configuration: Option<VectorConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VectorConfiguration {
    #[serde(default)]
    pub embedding_model_arn: String,
    #[serde(default)]
    pub embedding_model_configuration: Option<EmbeddingModelConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmbeddingModelConfiguration {
    #[serde(default)]
    pub bedrock_embedding_model_configuration: Option<BedrockEmbeddingModelConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BedrockEmbeddingModelConfiguration {
    #[serde(default)]
    pub dimensions: Option<u32>,
}

/// Vector store backing the knowledge base. Either the raw collection
/// configuration or the `openSearchServerless` form that can point at a
/// local collection by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StorageConfiguration {
    #[serde(default, rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub opensearch_serverless_configuration: Option<OpenSearchServerlessConfiguration>,
    #[serde(default)]
    pub open_search_serverless: Option<OpenSearchServerlessStorage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OpenSearchServerlessConfiguration {
    #[serde(default)]
    pub collection_arn: String,
    #[serde(default)]
    pub vector_index_name: String,
    #[serde(default)]
    pub field_mapping: FieldMapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OpenSearchServerlessStorage {
    #[serde(default)]
    pub collection_arn: Option<String>,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub collection_name: Reference,
    #[serde(default)]
    pub vector_index_name: Option<String>,
    #[serde(default)]
    pub field_mapping: Option<FieldMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldMapping {
    #[serde(default)]
    pub vector_field: String,
    #[serde(default)]
    pub text_field: String,
    #[serde(default)]
    pub metadata_field: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DataSource {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub s3_configuration: Option<S3DataSourceConfiguration>,
    #[serde(default)]
    pub chunking_configuration: Option<ChunkingConfiguration>,
    #[serde(default)]
    pub vector_ingestion_configuration: Option<VectorIngestionConfiguration>,
    #[serde(default)]
    pub custom_transformation: Option<CustomTransformation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct S3DataSourceConfiguration {
    #[serde(default)]
    pub bucket_arn: String,
    #[serde(default)]
    pub inclusion_prefixes: Vec<String>,
    #[serde(default)]
    pub exclusion_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChunkingConfiguration {
    #[serde(default)]
    pub chunking_strategy: String,
    #[serde(default)]
    pub fixed_size_chunking_configuration: Option<FixedSizeChunking>,
    #[serde(default)]
    pub semantic_chunking_configuration: Option<SemanticChunking>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FixedSizeChunking {
    #[serde(default)]
    pub max_tokens: u32,
    #[serde(default)]
    pub overlap_percentage: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SemanticChunking {
    #[serde(default)]
    pub max_tokens: u32,
    #[serde(default)]
    pub buffer_size: u32,
    #[serde(default)]
    pub breakpoint_percentile_threshold: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VectorIngestionConfiguration {
    #[serde(default)]
    pub chunking_configuration: Option<ChunkingConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomTransformation {
    #[serde(default)]
    pub transformation_lambda: Option<TransformationLambda>,
    #[serde(default)]
    pub intermediate_storage: Option<IntermediateStorage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransformationLambda {
    #[serde(default)]
    pub lambda_arn: Option<String>,
    #[serde(default)]
    pub lambda: Reference,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IntermediateStorage {
    #[serde(default)]
    pub s3_location: Option<S3Uri>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct S3Uri {
    #[serde(default)]
    pub uri: String,
}

impl Spec for KnowledgeBaseSpec {
    const KIND: ResourceKind = ResourceKind::KnowledgeBase;

    fn reference_sites(&self) -> Vec<ReferenceSite<'_>> {
        let mut sites = Vec::new();
        if let Some(oss) = self
            .storage_configuration
            .as_ref()
            .and_then(|s| s.open_search_serverless.as_ref())
        {
            let external = if is_set(&oss.collection_arn) {
                ("collectionArn", &oss.collection_arn)
            } else {
                ("collectionId", &oss.collection_id)
            };
            sites.push(
                ReferenceSite::new(
                    "spec.storageConfiguration.openSearchServerless.collectionName",
                    &oss.collection_name,
                    ResourceKind::OpenSearchServerless,
                )
                .with_external(external.0, external.1),
            );
        }
        for (i, source) in self.data_sources.iter().enumerate() {
            if let Some(lambda) = source
                .custom_transformation
                .as_ref()
                .and_then(|t| t.transformation_lambda.as_ref())
            {
                sites.push(
                    ReferenceSite::new(
                        format!(
                            "spec.dataSources[{}].customTransformation.transformationLambda.lambda",
                            i
                        ),
                        &lambda.lambda,
                        ResourceKind::Lambda,
                    )
                    .with_external("lambdaArn", &lambda.lambda_arn),
                );
            }
        }
        sites
    }

    fn check(&self) -> Result<(), String> {
        if self.knowledge_base_configuration.is_none() {
            return Err("knowledgeBaseConfiguration is required".to_string());
        }
        if self.storage_configuration.is_none() {
            return Err("storageConfiguration is required".to_string());
        }
        for (i, source) in self.data_sources.iter().enumerate() {
            if source.name.is_empty() {
                return Err(format!("dataSources[{}].name is required", i));
            }
        }
        Ok(())
    }

    fn tags(&self) -> Option<&Tags> {
        Some(&self.tags)
    }
}
