//! Prompt projection.

use super::ir::{Block, Fields, Value};
use super::{invalid, sanitize_resource_name, Generator};
use crate::error::GenerationError;
use crate::model::prompt::{
    ChatTemplate, ContentBlock, GenAiResource, InferenceConfiguration, InputVariable,
    PromptVariant, TemplateConfiguration, TextTemplate, ToolConfiguration, TEMPLATE_CHAT,
    TEMPLATE_TEXT,
};
use crate::model::{Document, PromptSpec, ResourceKind};

const PROMPT_MODULE: &str = "bedrock-prompt";

pub(crate) fn generate(
    gen: &Generator<'_>,
    doc: &Document,
    spec: &PromptSpec,
) -> Result<Block, GenerationError> {
    let mut block = gen.module_block(&sanitize_resource_name(doc.name()), PROMPT_MODULE);
    block
        .body
        .set("prompt_name", doc.name())
        .set_opt("description", doc.description())
        .set_str("customer_encryption_key_arn", &spec.customer_encryption_key_arn)
        .set_str("default_variant", &spec.default_variant)
        .set_non_empty("input_variables", input_variables(&spec.input_variables));

    let variants = spec
        .variants
        .iter()
        .enumerate()
        .map(|(i, variant)| variant_value(gen, doc, i, variant))
        .collect::<Result<Vec<_>, _>>()?;
    block.body.set("variants", variants);
    block.body.set_non_empty("tags", &spec.tags);
    Ok(block)
}

/// Declared template type, else whichever configuration is present.
fn template_type(variant: &PromptVariant) -> &str {
    if let Some(declared) = variant.template_type.as_deref().filter(|t| !t.is_empty()) {
        return declared;
    }
    match &variant.template_configuration {
        Some(TemplateConfiguration { chat: Some(_), text: None }) => TEMPLATE_CHAT,
        _ => TEMPLATE_TEXT,
    }
}

fn variant_value(
    gen: &Generator<'_>,
    doc: &Document,
    index: usize,
    variant: &PromptVariant,
) -> Result<Value, GenerationError> {
    let template_type = template_type(variant);
    let mut fields = Fields::new();
    fields
        .set("name", variant.name.as_str())
        .set("model_id", variant.model_id.as_str())
        .set("template_type", template_type);

    if let Some(config) = &variant.template_configuration {
        let mut template = Fields::new();
        match template_type {
            TEMPLATE_CHAT => {
                if let Some(chat) = &config.chat {
                    template.set("chat", chat_template(doc, chat)?);
                }
            }
            _ => {
                if let Some(text) = &config.text {
                    template.set("text", text_template(text));
                }
            }
        }
        fields.set("template_configuration", template);
    }

    if let Some(inference) = &variant.inference_configuration {
        fields.set("inference_configuration", inference_value(inference));
    }

    if let Some(resource) = &variant.gen_ai_resource {
        fields.set("gen_ai_resource", gen_ai_resource(gen, doc, index, resource)?);
    }
    Ok(fields.into())
}

fn input_variables(variables: &[InputVariable]) -> Vec<Value> {
    variables
        .iter()
        .map(|v| Fields::new().with("name", v.name.as_str()).into())
        .collect()
}

fn text_blocks(blocks: &[ContentBlock]) -> Vec<Value> {
    blocks
        .iter()
        .map(|b| Fields::new().with("text", b.text.as_str()).into())
        .collect()
}

fn text_template(text: &TextTemplate) -> Fields {
    let mut fields = Fields::new();
    fields
        .set("text", text.text.as_str())
        .set_non_empty("input_variables", input_variables(&text.input_variables));
    fields
}

fn chat_template(doc: &Document, chat: &ChatTemplate) -> Result<Fields, GenerationError> {
    let messages: Vec<Value> = chat
        .messages
        .iter()
        .map(|m| {
            let mut fields = Fields::new();
            fields
                .set("role", m.role.as_str())
                .set_non_empty("content", text_blocks(&m.content));
            fields.into()
        })
        .collect();

    let mut fields = Fields::new();
    fields
        .set_non_empty("messages", messages)
        .set_non_empty("system", text_blocks(&chat.system));
    if let Some(tools) = &chat.tool_configuration {
        fields.set("tool_configuration", tool_configuration(doc, tools)?);
    }
    fields.set_non_empty("input_variables", input_variables(&chat.input_variables));
    Ok(fields)
}

/// Tool input schemas are passed to the module as JSON strings.
fn tool_configuration(doc: &Document, config: &ToolConfiguration) -> Result<Fields, GenerationError> {
    let mut tools = Vec::with_capacity(config.tools.len());
    for tool in &config.tools {
        let spec = &tool.tool_spec;
        let mut tool_spec = Fields::new();
        tool_spec
            .set("name", spec.name.as_str())
            .set_str("description", &spec.description);
        if let Some(schema) = &spec.input_schema {
            let json = serde_json::to_string(&schema.json).map_err(|e| {
                invalid(doc, format!("tool '{}' input schema is not JSON: {}", spec.name, e))
            })?;
            tool_spec.set("input_schema", Fields::new().with("json", json));
        }
        tools.push(Value::from(Fields::new().with("tool_spec", tool_spec)));
    }

    let mut fields = Fields::new();
    fields.set_non_empty("tools", tools);
    if let Some(choice) = &config.tool_choice {
        let mut selected = Fields::new();
        if choice.auto.is_some() {
            selected.set("auto", Value::empty_object());
        } else if choice.any.is_some() {
            selected.set("any", Value::empty_object());
        } else if let Some(tool) = &choice.tool {
            selected.set("tool", Fields::new().with("name", tool.name.as_str()));
        }
        fields.set("tool_choice", selected);
    }
    Ok(fields)
}

fn inference_value(config: &InferenceConfiguration) -> Fields {
    let mut fields = Fields::new();
    if let Some(text) = &config.text {
        let mut inference = Fields::new();
        inference
            .set_opt("temperature", text.temperature)
            .set_opt("top_p", text.top_p)
            .set_opt("top_k", text.top_k)
            .set_opt("max_tokens", text.max_tokens)
            .set_non_empty("stop_sequences", &text.stop_sequences);
        fields.set("text", inference);
    }
    fields
}

fn gen_ai_resource(
    gen: &Generator<'_>,
    doc: &Document,
    index: usize,
    resource: &GenAiResource,
) -> Result<Fields, GenerationError> {
    let mut fields = Fields::new();
    if let Some(agent) = &resource.agent {
        let field = format!("spec.variants[{}].genAiResource.agent.agentName", index);
        let identifier = gen
            .literal_or_interpolate(
                doc,
                &field,
                &agent.agent_arn,
                &agent.agent_name,
                ResourceKind::Agent,
                "agent_id",
            )?
            .ok_or_else(|| {
                invalid(doc, format!("{} needs either agentName or agentArn", field))
            })?;
        fields.set("agent", Fields::new().with("agent_identifier", identifier));
    }
    Ok(fields)
}
