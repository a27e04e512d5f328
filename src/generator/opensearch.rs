//! OpenSearchServerless projection: native security policies, the
//! collection and an optional vector index bootstrap.

use super::ir::{Block, Value};
use super::{invalid, sanitize_resource_name, Generator};
use crate::error::GenerationError;
use crate::model::opensearch::{AccessPolicy, EncryptionPolicy, NetworkPolicy, VectorIndex};
use crate::model::{Document, OpenSearchServerlessSpec};
use serde_json::json;
use std::collections::BTreeSet;

const SECURITY_POLICY: &str = "aws_opensearchserverless_security_policy";
const ACCESS_POLICY: &str = "aws_opensearchserverless_access_policy";
const COLLECTION: &str = "aws_opensearchserverless_collection";
/// Security and access policy names are limited to 32 characters.
const POLICY_NAME_MAX: usize = 32;
const INDEX_DIMENSION: u32 = 1536;

const DEFAULT_PERMISSIONS: [&str; 4] = [
    "aoss:CreateCollectionItems",
    "aoss:DeleteCollectionItems",
    "aoss:UpdateCollectionItems",
    "aoss:DescribeCollectionItems",
];

const BEDROCK_PERMISSIONS: [&str; 10] = [
    "aoss:CreateIndex",
    "aoss:DeleteIndex",
    "aoss:UpdateIndex",
    "aoss:DescribeIndex",
    "aoss:ReadDocument",
    "aoss:WriteDocument",
    "aoss:CreateCollectionItems",
    "aoss:DeleteCollectionItems",
    "aoss:UpdateCollectionItems",
    "aoss:DescribeCollectionItems",
];

/// Resource label shared by every block generated for a collection.
pub(crate) fn collection_label(name: &str) -> String {
    sanitize_resource_name(name)
}

pub(crate) fn generate(
    _gen: &Generator<'_>,
    doc: &Document,
    spec: &OpenSearchServerlessSpec,
) -> Result<Vec<Block>, GenerationError> {
    let label = collection_label(doc.name());
    let collection = spec.collection_name.as_str();

    let mut blocks = vec![
        encryption_policy(doc, &label, collection, spec.encryption_policy.as_ref())?,
        network_policy(doc, &label, collection, spec.network_policy.as_ref())?,
        access_policy(doc, &label, collection, spec.access_policy.as_ref())?,
    ];

    let mut block = Block::resource(COLLECTION, label.clone());
    block
        .body
        .set("name", collection)
        .set("type", spec.collection_type())
        .set_opt("description", doc.description())
        .set_non_empty("tags", &spec.tags)
        .set(
            "depends_on",
            vec![
                Value::traversal(format!("{}.{}_encryption_policy", SECURITY_POLICY, label)),
                Value::traversal(format!("{}.{}_network_policy", SECURITY_POLICY, label)),
                Value::traversal(format!("{}.{}_access_policy", ACCESS_POLICY, label)),
            ],
        );
    blocks.push(block);

    if let Some(index) = &spec.vector_index {
        blocks.push(vector_index(&label, collection, index));
    }
    Ok(blocks)
}

/// `<collection>-<suffix>`, cut to the policy name limit.
fn policy_name(collection: &str, suffix: &str) -> String {
    let mut name = format!("{}-{}", collection, suffix);
    name.truncate(POLICY_NAME_MAX);
    name.trim_end_matches('-').to_string()
}

fn policy_block(
    resource_type: &str,
    label: String,
    name: String,
    kind: &str,
    description: String,
    policy: String,
) -> Block {
    let mut block = Block::resource(resource_type, label);
    block
        .body
        .set("name", name)
        .set("type", kind)
        .set("description", description)
        .set("policy", policy);
    block
}

fn to_json(doc: &Document, value: &serde_json::Value) -> Result<String, GenerationError> {
    serde_json::to_string(value).map_err(|e| invalid(doc, format!("policy document: {}", e)))
}

fn encryption_policy(
    doc: &Document,
    label: &str,
    collection: &str,
    policy: Option<&EncryptionPolicy>,
) -> Result<Block, GenerationError> {
    let mut document = json!({
        "Rules": [{
            "Resource": [format!("collection/{}", collection)],
            "ResourceType": "collection",
        }],
        "AWSOwnedKey": true,
    });
    if let Some(key) = policy.and_then(|p| p.kms_key_id.as_deref()).filter(|k| !k.is_empty()) {
        document["AWSOwnedKey"] = json!(false);
        document["KmsKeyId"] = json!(key);
    }
    Ok(policy_block(
        SECURITY_POLICY,
        format!("{}_encryption_policy", label),
        named(policy.and_then(|p| p.name.as_deref()), collection, "enc"),
        "encryption",
        described(
            policy.and_then(|p| p.description.as_deref()),
            format!("Encryption policy for {} collection", collection),
        ),
        to_json(doc, &document)?,
    ))
}

fn network_policy(
    doc: &Document,
    label: &str,
    collection: &str,
    policy: Option<&NetworkPolicy>,
) -> Result<Block, GenerationError> {
    let resources = json!([
        format!("collection/{}", collection),
        format!("dashboard/{}", collection),
    ]);
    let mut rule = json!({
        "Rules": [
            {"Resource": resources.clone(), "ResourceType": "collection"},
            {"Resource": resources, "ResourceType": "dashboard"},
        ],
        "AllowFromPublic": true,
    });
    if let Some(access) = policy.map(|p| &p.access).filter(|a| !a.is_empty()) {
        rule["AllowFromPublic"] = json!(false);
        let endpoints: Vec<&String> = access
            .iter()
            .filter(|a| a.source_type.as_deref() == Some("vpc"))
            .flat_map(|a| a.source_vpces.iter())
            .collect();
        if !endpoints.is_empty() {
            rule["SourceVPCEs"] = json!(endpoints);
        }
    }
    Ok(policy_block(
        SECURITY_POLICY,
        format!("{}_network_policy", label),
        named(policy.and_then(|p| p.name.as_deref()), collection, "net"),
        "network",
        described(
            policy.and_then(|p| p.description.as_deref()),
            format!("Network policy for {} collection", collection),
        ),
        to_json(doc, &json!([rule]))?,
    ))
}

fn access_policy(
    doc: &Document,
    label: &str,
    collection: &str,
    policy: Option<&AccessPolicy>,
) -> Result<Block, GenerationError> {
    let mut principals: Vec<String> = policy.map(|p| p.principals.clone()).unwrap_or_default();
    let mut permissions: Vec<String> = match policy.filter(|p| !p.permissions.is_empty()) {
        Some(p) => p.permissions.clone(),
        None => DEFAULT_PERMISSIONS.iter().map(|p| p.to_string()).collect(),
    };
    if policy.is_some_and(|p| p.auto_configure_for_bedrock) {
        principals.push("bedrock.amazonaws.com".to_string());
        let merged: BTreeSet<String> = permissions
            .into_iter()
            .chain(BEDROCK_PERMISSIONS.iter().map(|p| p.to_string()))
            .collect();
        permissions = merged.into_iter().collect();
    }

    let resources = json!([
        format!("collection/{}", collection),
        format!("index/{}/*", collection),
    ]);
    let document = json!([{
        "Rules": [
            {"Resource": resources.clone(), "Permission": permissions.clone(), "ResourceType": "collection"},
            {"Resource": resources, "Permission": permissions, "ResourceType": "index"},
        ],
        "Principal": principals,
    }]);
    Ok(policy_block(
        ACCESS_POLICY,
        format!("{}_access_policy", label),
        named(policy.and_then(|p| p.name.as_deref()), collection, "access"),
        "data",
        described(
            policy.and_then(|p| p.description.as_deref()),
            format!("Data access policy for {} collection", collection),
        ),
        to_json(doc, &document)?,
    ))
}

fn named(explicit: Option<&str>, collection: &str, suffix: &str) -> String {
    match explicit.filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => policy_name(collection, suffix),
    }
}

fn described(explicit: Option<&str>, fallback: String) -> String {
    explicit
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or(fallback)
}

/// Creates the kNN index once the collection endpoint exists.
fn vector_index(label: &str, collection: &str, index: &VectorIndex) -> Block {
    let mapping = &index.field_mapping;
    let body = json!({
        "settings": {"index": {"knn": true, "knn.algo_param.ef_search": 512}},
        "mappings": {"properties": {
            mapping.vector_field.as_str(): {
                "type": "knn_vector",
                "dimension": INDEX_DIMENSION,
                "method": {"name": "hnsw", "space_type": "l2", "engine": "nmslib"},
            },
            mapping.text_field.as_str(): {"type": "text"},
            mapping.metadata_field.as_str(): {"type": "text"},
        }},
    });
    let command = format!(
        "aws opensearchserverless batch-get-collection --names {} --query 'collectionDetails[0].collectionEndpoint' --output text | xargs -I {{}} curl -X PUT \"{{}}/{}\" -H \"Content-Type: application/json\" -d '{}'",
        collection, index.name, body
    );

    let mut provisioner = Block::new("provisioner", &["local-exec"]);
    provisioner.body.set("command", command);

    let mut block = Block::resource("null_resource", format!("{}_vector_index", label));
    block.body.push_block(provisioner);
    block.body.set(
        "depends_on",
        vec![Value::traversal(format!("{}.{}", COLLECTION, label))],
    );
    block
}
