//! ActionGroup projection and the executor/schema objects it shares with
//! inline agent action groups.

use super::ir::{Block, Fields, Value};
use super::{invalid, sanitize_resource_name, timeouts, Generator};
use crate::error::GenerationError;
use crate::model::action_group::{ActionGroupExecutor, ApiSchema, FunctionSchema};
use crate::model::{ActionGroupSpec, Document, ResourceKind};
use crate::packager::SchemaPackage;
use std::collections::BTreeMap;
use tracing::debug;

const ACTION_GROUP_MODULE: &str = "bedrock-action-group";
const DEFAULT_AGENT_VERSION: &str = "DRAFT";

pub(crate) fn generate(
    gen: &Generator<'_>,
    doc: &Document,
    spec: &ActionGroupSpec,
) -> Result<Block, GenerationError> {
    let name = doc.name();
    let mut block = gen.module_block(&sanitize_resource_name(name), ACTION_GROUP_MODULE);
    let agent_id = gen.interpolate(doc, "spec.agentId", &spec.agent_id, ResourceKind::Agent, "agent_id")?;

    let body = &mut block.body;
    body.set("action_group_name", name)
        .set("agent_id", agent_id)
        .set(
            "agent_version",
            spec.agent_version
                .as_deref()
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_AGENT_VERSION),
        )
        .set_opt("description", doc.description())
        .set_str("parent_action_group_signature", &spec.parent_action_group_signature)
        .set_str("action_group_state", &spec.action_group_state);
    if spec.skip_resource_in_use_check {
        body.set("skip_resource_in_use_check", true);
    }

    let executor = spec
        .action_group_executor
        .as_ref()
        .ok_or_else(|| invalid(doc, "actionGroupExecutor is required"))?;
    body.set(
        "action_group_executor",
        executor_fields(gen, doc, "spec.actionGroupExecutor.lambda", executor)?,
    );

    let package = gen.context().schema_package(name);
    if let Some(package) = package {
        debug!(action_group = %name, uri = %package.uri, "Using packaged API schema");
    }
    match (&spec.api_schema, package) {
        (Some(schema), package) => {
            body.set_non_empty("api_schema", schema_fields(schema, package));
        }
        (None, Some(package)) => {
            body.set("api_schema", schema_fields(&ApiSchema::default(), Some(package)));
        }
        (None, None) => {}
    }

    if let Some(schema) = &spec.function_schema {
        body.set("function_schema", function_schema_json(doc, schema)?);
    }

    body.set_non_empty("tags", &spec.tags)
        .set_opt("prepare_agent", spec.prepare_agent);
    if let Some(fields) = spec.timeouts.as_ref().and_then(timeouts) {
        body.set("timeouts", fields);
    }
    Ok(block)
}

/// `lambda` is the external ARN or the referenced function's ARN output;
/// `custom_control` is passed through.
pub(crate) fn executor_fields(
    gen: &Generator<'_>,
    doc: &Document,
    field: &str,
    executor: &ActionGroupExecutor,
) -> Result<Fields, GenerationError> {
    let mut fields = Fields::new();
    fields.set_opt(
        "lambda",
        gen.literal_or_interpolate(
            doc,
            field,
            &executor.lambda_arn,
            &executor.lambda,
            ResourceKind::Lambda,
            "lambda_function_arn",
        )?,
    );
    fields.set_str("custom_control", &executor.custom_control);
    Ok(fields)
}

/// An uploaded schema replaces the declared S3 location; an inline payload
/// is kept as is.
pub(crate) fn schema_fields(schema: &ApiSchema, package: Option<&SchemaPackage>) -> Fields {
    let mut fields = Fields::new();
    match (package, &schema.s3) {
        (Some(package), _) => {
            fields.set(
                "s3",
                Fields::new()
                    .with("s3_bucket_name", package.bucket.as_str())
                    .with("s3_object_key", package.key.as_str()),
            );
        }
        (None, Some(s3)) => {
            let mut location = Fields::new();
            location
                .set_str("s3_bucket_name", &s3.s3_bucket_name)
                .set_str("s3_object_key", &s3.s3_object_key);
            fields.set_non_empty("s3", location);
        }
        (None, None) => {}
    }
    fields.set_str("payload", &schema.payload);
    fields
}

/// The action group module takes each function's parameters as a JSON
/// document.
fn function_schema_json(doc: &Document, schema: &FunctionSchema) -> Result<Fields, GenerationError> {
    let mut functions = Vec::with_capacity(schema.functions.len());
    for function in &schema.functions {
        let params: BTreeMap<&str, serde_json::Value> = function
            .parameters
            .iter()
            .map(|(name, param)| {
                (
                    name.as_str(),
                    serde_json::json!({
                        "description": param.description.clone().unwrap_or_default(),
                        "required": param.required,
                        "type": param.r#type.clone().unwrap_or_default(),
                    }),
                )
            })
            .collect();
        let parameters = serde_json::to_string(&params).map_err(|e| {
            invalid(doc, format!("function '{}' parameters: {}", function.name, e))
        })?;
        let mut entry = Fields::new();
        entry
            .set("name", function.name.as_str())
            .set(
                "description",
                function
                    .description
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .map(Value::from)
                    .unwrap_or(Value::Null),
            )
            .set("parameters", parameters);
        functions.push(Value::from(entry));
    }
    Ok(Fields::new().with("functions", functions))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{add, config};
    use super::super::{hcl, Generator, GenerationContext};
    use crate::error::GenerationError;
    use crate::generator::ir::Value;
    use crate::packager::SchemaPackage;
    use crate::registry::Registry;
    use std::path::PathBuf;

    const AGENT: &str = "foundationModel: m\ninstruction: i\n";

    #[test]
    fn test_action_group_projection() {
        let registry = Registry::new();
        add(&registry, "Agent", "support", AGENT);
        add(
            &registry,
            "ActionGroup",
            "lookup",
            "agentId: support\nactionGroupExecutor:\n  customControl: RETURN_CONTROL\nfunctionSchema:\n  functions:\n    - name: find\n      parameters:\n        id: { type: string, required: true }\n",
        );
        let tree = Generator::new(&registry, config()).unwrap().generate().unwrap();
        let block = tree.module("lookup").unwrap();
        assert_eq!(
            block.body.attribute("agent_id"),
            Some(&Value::interpolation("module.support.agent_id"))
        );
        assert_eq!(block.body.attribute("agent_version"), Some(&Value::from("DRAFT")));
        let text = hcl::render_block(block);
        assert!(text.contains("custom_control = \"RETURN_CONTROL\""));
        assert!(text.contains(
            "parameters  = \"{\\\"id\\\":{\\\"description\\\":\\\"\\\",\\\"required\\\":true,\\\"type\\\":\\\"string\\\"}}\""
        ));
        assert!(text.contains("description = null"));
    }

    #[test]
    fn test_unresolved_agent_is_an_error() {
        let registry = Registry::new();
        add(
            &registry,
            "ActionGroup",
            "orphan",
            "agentId: ghost\nactionGroupExecutor:\n  customControl: RETURN_CONTROL\n",
        );
        let err = Generator::new(&registry, config()).unwrap().generate().unwrap_err();
        let GenerationError::Failed { errors, .. } = err else {
            panic!("expected Failed");
        };
        assert!(matches!(errors[0], GenerationError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_schema_package_overrides_declared_location() {
        let registry = Registry::new();
        add(&registry, "Agent", "support", AGENT);
        add(
            &registry,
            "ActionGroup",
            "orders",
            "agentId: support\nactionGroupExecutor:\n  lambdaArn: arn:aws:lambda:us-east-1:1:function:f\napiSchema:\n  s3:\n    s3BucketName: old\n    s3ObjectKey: old.json\n",
        );
        let mut context = GenerationContext::default();
        context.schema_packages.insert(
            "orders".to_string(),
            SchemaPackage {
                name: "orders".to_string(),
                bucket: "artifacts".to_string(),
                key: "schemas/orders/openapi.json".to_string(),
                uri: "s3://artifacts/schemas/orders/openapi.json".to_string(),
                content_type: "application/json".to_string(),
                source_file: PathBuf::from("defs/orders/openapi.json"),
            },
        );
        let tree = Generator::new(&registry, config())
            .unwrap()
            .with_context(context)
            .generate()
            .unwrap();
        let text = hcl::render_block(tree.module("orders").unwrap());
        assert!(text.contains("s3_bucket_name = \"artifacts\""));
        assert!(text.contains("s3_object_key  = \"schemas/orders/openapi.json\""));
        assert!(!text.contains("old.json"));
    }
}
