//! KnowledgeBase projection.
//!
//! Data-source entries always carry the same keys, with `null` for absent
//! nested configurations, so the module sees a uniformly typed list.

use super::ir::{Block, Fields, Value};
use super::opensearch::collection_label;
use super::{invalid, sanitize_resource_name, Generator};
use crate::error::GenerationError;
use crate::model::knowledge_base::{
    ChunkingConfiguration, CustomTransformation, DataSource, FieldMapping,
    KnowledgeBaseConfiguration, OpenSearchServerlessStorage, SemanticChunking,
    StorageConfiguration,
};
use crate::model::{Document, KnowledgeBaseSpec, ResourceKind, ResourceSpec};

const KNOWLEDGE_BASE_MODULE: &str = "bedrock-knowledge-base";

pub(crate) fn generate(
    gen: &Generator<'_>,
    doc: &Document,
    spec: &KnowledgeBaseSpec,
) -> Result<Block, GenerationError> {
    let mut block = gen.module_block(&sanitize_resource_name(doc.name()), KNOWLEDGE_BASE_MODULE);
    block
        .body
        .set("knowledge_base_name", doc.name())
        .set_opt("description", doc.description());

    if let Some(config) = &spec.knowledge_base_configuration {
        block
            .body
            .set("knowledge_base_configuration", kb_configuration(config));
    }
    if let Some(storage) = &spec.storage_configuration {
        let storage = storage_configuration(gen, doc, storage)?;
        block.body.set("storage_configuration", storage);
    }
    if !spec.data_sources.is_empty() {
        let sources = spec
            .data_sources
            .iter()
            .enumerate()
            .map(|(i, source)| data_source(gen, doc, i, source))
            .collect::<Result<Vec<_>, _>>()?;
        block.body.set("data_sources", sources);
    }
    block.body.set_non_empty("tags", &spec.tags);
    Ok(block)
}

fn kb_configuration(config: &KnowledgeBaseConfiguration) -> Fields {
    let mut fields = Fields::new();
    fields.set("type", config.r#type.as_str());
    if let Some(vector) = &config.vector_knowledge_base_configuration {
        let mut vector_fields = Fields::new();
        vector_fields.set("embedding_model_arn", vector.embedding_model_arn.as_str());
        let dimensions = vector
            .embedding_model_configuration
            .as_ref()
            .and_then(|c| c.bedrock_embedding_model_configuration.as_ref())
            .and_then(|c| c.dimensions)
            .filter(|d| *d > 0);
        if let Some(dimensions) = dimensions {
            vector_fields.set(
                "embedding_model_configuration",
                Fields::new().with(
                    "bedrock_embedding_model_configuration",
                    Fields::new().with("dimensions", dimensions),
                ),
            );
        }
        fields.set("vector_knowledge_base_configuration", vector_fields);
    }
    fields
}

fn storage_configuration(
    gen: &Generator<'_>,
    doc: &Document,
    storage: &StorageConfiguration,
) -> Result<Fields, GenerationError> {
    let mut fields = Fields::new();
    fields.set("type", storage.r#type.as_str());
    if let Some(oss) = &storage.open_search_serverless {
        fields.set(
            "opensearch_serverless_configuration",
            collection_storage(gen, doc, oss)?,
        );
    } else if let Some(raw) = &storage.opensearch_serverless_configuration {
        fields.set(
            "opensearch_serverless_configuration",
            Fields::new()
                .with("collection_arn", raw.collection_arn.as_str())
                .with("vector_index_name", raw.vector_index_name.as_str())
                .with("field_mapping", field_mapping(&raw.field_mapping)),
        );
    }
    Ok(fields)
}

/// Storage on a collection. A local collection supplies the index name and
/// field mapping when the knowledge base leaves them out.
fn collection_storage(
    gen: &Generator<'_>,
    doc: &Document,
    oss: &OpenSearchServerlessStorage,
) -> Result<Fields, GenerationError> {
    const FIELD: &str = "spec.storageConfiguration.openSearchServerless.collectionName";
    let mut fields = Fields::new();
    let mut index_name = oss.vector_index_name.clone().filter(|n| !n.is_empty());
    let mut mapping = oss.field_mapping.clone();

    if !oss.collection_name.is_empty() {
        let collection = gen.resolve(doc, FIELD, &oss.collection_name, ResourceKind::OpenSearchServerless)?;
        fields.set(
            "collection_arn",
            Value::interpolation(format!(
                "aws_opensearchserverless_collection.{}.arn",
                collection_label(collection.name())
            )),
        );
        if let ResourceSpec::OpenSearchServerless(collection_spec) = &collection.spec {
            if let Some(index) = &collection_spec.vector_index {
                index_name.get_or_insert_with(|| index.name.clone());
                mapping.get_or_insert_with(|| FieldMapping {
                    vector_field: index.field_mapping.vector_field.clone(),
                    text_field: index.field_mapping.text_field.clone(),
                    metadata_field: index.field_mapping.metadata_field.clone(),
                });
            }
        }
    } else if let Some(arn) = oss.collection_arn.as_deref().filter(|a| !a.is_empty()) {
        fields.set("collection_arn", arn);
    } else if let Some(id) = oss.collection_id.as_deref().filter(|i| !i.is_empty()) {
        fields.set("collection_id", id);
    } else {
        return Err(invalid(
            doc,
            "openSearchServerless needs collectionArn, collectionName or collectionId",
        ));
    }

    let index_name = index_name
        .ok_or_else(|| invalid(doc, "openSearchServerless.vectorIndexName is required"))?;
    fields
        .set("vector_index_name", index_name)
        .set("field_mapping", field_mapping(&mapping.unwrap_or_default()));
    Ok(fields)
}

fn field_mapping(mapping: &FieldMapping) -> Fields {
    Fields::new()
        .with("vector_field", mapping.vector_field.as_str())
        .with("text_field", mapping.text_field.as_str())
        .with("metadata_field", mapping.metadata_field.as_str())
}

fn data_source(
    gen: &Generator<'_>,
    doc: &Document,
    index: usize,
    source: &DataSource,
) -> Result<Value, GenerationError> {
    let s3 = source.s3_configuration.as_ref().map(|s3| {
        Value::from(
            Fields::new()
                .with("bucket_arn", s3.bucket_arn.as_str())
                .with("inclusion_prefixes", list_or_null(&s3.inclusion_prefixes))
                .with("exclusion_prefixes", list_or_null(&s3.exclusion_prefixes)),
        )
    });
    let chunking = source
        .chunking_configuration
        .as_ref()
        .map(|c| Value::from(chunking_fields(c, true)));
    let ingestion = source
        .vector_ingestion_configuration
        .as_ref()
        .and_then(|v| v.chunking_configuration.as_ref())
        .map(|c| Value::from(Fields::new().with("chunking_configuration", chunking_fields(c, false))));
    let transformation = match &source.custom_transformation {
        Some(custom) => Some(Value::from(custom_transformation(gen, doc, index, custom)?)),
        None => None,
    };

    Ok(Fields::new()
        .with("name", source.name.as_str())
        .with("type", source.r#type.as_str())
        .with("s3_configuration", s3.unwrap_or(Value::Null))
        .with("chunking_configuration", chunking.unwrap_or(Value::Null))
        .with("vector_ingestion_configuration", ingestion.unwrap_or(Value::Null))
        .with("custom_transformation", transformation.unwrap_or(Value::Null))
        .into())
}

fn list_or_null(items: &[String]) -> Value {
    if items.is_empty() {
        Value::Null
    } else {
        Value::from(items)
    }
}

/// Ingestion-level chunking has no fixed-size variant.
fn chunking_fields(config: &ChunkingConfiguration, with_fixed_size: bool) -> Fields {
    let mut fields = Fields::new();
    fields.set("chunking_strategy", config.chunking_strategy.as_str());
    if with_fixed_size {
        let fixed = config
            .fixed_size_chunking_configuration
            .as_ref()
            .map(|f| {
                Value::from(
                    Fields::new()
                        .with("max_tokens", f.max_tokens)
                        .with("overlap_percentage", f.overlap_percentage),
                )
            })
            .unwrap_or(Value::Null);
        fields.set("fixed_size_chunking_configuration", fixed);
    }
    fields.set(
        "semantic_chunking_configuration",
        config
            .semantic_chunking_configuration
            .as_ref()
            .map(semantic_chunking)
            .unwrap_or(Value::Null),
    );
    fields
}

fn semantic_chunking(config: &SemanticChunking) -> Value {
    Fields::new()
        .with("max_tokens", config.max_tokens)
        .with("buffer_size", config.buffer_size)
        .with(
            "breakpoint_percentile_threshold",
            config.breakpoint_percentile_threshold,
        )
        .into()
}

fn custom_transformation(
    gen: &Generator<'_>,
    doc: &Document,
    index: usize,
    custom: &CustomTransformation,
) -> Result<Fields, GenerationError> {
    let lambda = match &custom.transformation_lambda {
        Some(lambda) => {
            let field = format!(
                "spec.dataSources[{}].customTransformation.transformationLambda.lambda",
                index
            );
            let arn = gen
                .literal_or_interpolate(
                    doc,
                    &field,
                    &lambda.lambda_arn,
                    &lambda.lambda,
                    ResourceKind::Lambda,
                    "lambda_function_arn",
                )?
                .unwrap_or(Value::Null);
            Value::from(Fields::new().with("lambda_arn", arn))
        }
        None => Value::Null,
    };
    let storage = match &custom.intermediate_storage {
        Some(storage) => Value::from(
            Fields::new().with(
                "s3_location",
                storage
                    .s3_location
                    .as_ref()
                    .map(|loc| Value::from(Fields::new().with("uri", loc.uri.as_str())))
                    .unwrap_or(Value::Null),
            ),
        ),
        None => Value::Null,
    };
    Ok(Fields::new()
        .with("transformation_lambda", lambda)
        .with("intermediate_storage", storage))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{add, config};
    use super::super::{hcl, Generator};
    use crate::error::GenerationError;
    use crate::generator::ir::Value;
    use crate::registry::Registry;

    const KB_CONFIG: &str = "knowledgeBaseConfiguration:\n  type: VECTOR\n  vectorKnowledgeBaseConfiguration:\n    embeddingModelArn: arn:aws:bedrock:us-east-1::foundation-model/amazon.titan-embed-text-v2:0\n";

    #[test]
    fn test_collection_reference_fills_index_and_mapping() {
        let registry = Registry::new();
        add(
            &registry,
            "OpenSearchServerless",
            "docs-vectors",
            "collectionName: docs-vectors\nvectorIndex:\n  name: docs-index\n  fieldMapping:\n    vectorField: embedding\n",
        );
        add(
            &registry,
            "KnowledgeBase",
            "docs",
            &format!(
                "{}storageConfiguration:\n  type: OPENSEARCH_SERVERLESS\n  openSearchServerless:\n    collectionName: docs-vectors\n",
                KB_CONFIG
            ),
        );
        let tree = Generator::new(&registry, config()).unwrap().generate().unwrap();
        let block = tree.module("docs").unwrap();
        let Some(Value::Object(storage)) = block.body.attribute("storage_configuration") else {
            panic!("storage_configuration missing");
        };
        let Some(Value::Object(oss)) = storage.get("opensearch_serverless_configuration") else {
            panic!("opensearch_serverless_configuration missing");
        };
        assert_eq!(
            oss.get("collection_arn"),
            Some(&Value::interpolation("aws_opensearchserverless_collection.docs_vectors.arn"))
        );
        assert_eq!(oss.get("vector_index_name"), Some(&Value::from("docs-index")));
        let text = hcl::render_block(block);
        assert!(text.contains("vector_field   = \"embedding\""));
        assert!(text.contains("text_field     = \"text\""));
    }

    #[test]
    fn test_data_sources_use_nulls_for_absent_sections() {
        let registry = Registry::new();
        add(
            &registry,
            "KnowledgeBase",
            "docs",
            &format!(
                "{}storageConfiguration:\n  type: OPENSEARCH_SERVERLESS\n  openSearchServerless:\n    collectionArn: arn:aws:aoss:us-east-1:1:collection/abc\n    vectorIndexName: idx\ndataSources:\n  - name: bucket\n    type: S3\n    s3Configuration:\n      bucketArn: arn:aws:s3:::docs\n",
                KB_CONFIG
            ),
        );
        let tree = Generator::new(&registry, config()).unwrap().generate().unwrap();
        let text = hcl::render_block(tree.module("docs").unwrap());
        assert!(text.contains("chunking_configuration         = null"));
        assert!(text.contains("inclusion_prefixes = null"));
        assert!(text.contains("collection_arn    = \"arn:aws:aoss:us-east-1:1:collection/abc\""));
    }

    #[test]
    fn test_missing_index_name_is_invalid() {
        let registry = Registry::new();
        add(
            &registry,
            "KnowledgeBase",
            "docs",
            &format!(
                "{}storageConfiguration:\n  type: OPENSEARCH_SERVERLESS\n  openSearchServerless:\n    collectionArn: arn:aws:aoss:us-east-1:1:collection/abc\n",
                KB_CONFIG
            ),
        );
        let err = Generator::new(&registry, config()).unwrap().generate().unwrap_err();
        let GenerationError::Failed { errors, .. } = err else {
            panic!("expected Failed");
        };
        assert!(errors[0].to_string().contains("vectorIndexName"));
    }
}
