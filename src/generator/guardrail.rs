//! Guardrail projection.

use super::ir::{Block, Fields, Value};
use super::{sanitize_resource_name, Generator};
use crate::error::GenerationError;
use crate::model::{Document, GuardrailSpec};

const GUARDRAIL_MODULE: &str = "bedrock-guardrail";

pub(crate) fn generate(
    gen: &Generator<'_>,
    doc: &Document,
    spec: &GuardrailSpec,
) -> Result<Block, GenerationError> {
    let mut block = gen.module_block(&sanitize_resource_name(doc.name()), GUARDRAIL_MODULE);
    let body = &mut block.body;
    body.set("guardrail_name", doc.name())
        .set_opt("description", doc.description())
        .set_str("blocked_input_messaging", &spec.blocked_input_messaging)
        .set_str("blocked_outputs_messaging", &spec.blocked_outputs_messaging);

    if let Some(content) = &spec.content_policy_config {
        let filters = objects(&content.filters_config, |f| {
            Fields::new()
                .with("type", f.r#type.as_str())
                .with("input_strength", f.input_strength.as_str())
                .with("output_strength", f.output_strength.as_str())
        });
        body.set(
            "content_policy_config",
            Fields::new().with("filters_config", filters),
        );
    }

    if let Some(sensitive) = &spec.sensitive_information_policy_config {
        let entities = objects(&sensitive.pii_entities_config, |e| {
            Fields::new()
                .with("type", e.r#type.as_str())
                .with("action", e.action.as_str())
        });
        body.set(
            "sensitive_information_policy_config",
            Fields::new().with("pii_entities_config", entities),
        );
    }

    if let Some(grounding) = &spec.contextual_grounding_policy_config {
        let filters = objects(&grounding.filters_config, |f| {
            Fields::new()
                .with("type", f.r#type.as_str())
                .with("threshold", f.threshold)
        });
        body.set(
            "contextual_grounding_policy_config",
            Fields::new().with("filters_config", filters),
        );
    }

    if let Some(topics) = &spec.topic_policy_config {
        let topics = objects(&topics.topics_config, |t| {
            let mut fields = Fields::new();
            fields
                .set("name", t.name.as_str())
                .set("definition", t.definition.as_str())
                .set_non_empty("examples", &t.examples)
                .set("type", t.r#type.as_str());
            fields
        });
        body.set("topic_policy_config", Fields::new().with("topics_config", topics));
    }

    if let Some(words) = &spec.word_policy_config {
        let mut fields = Fields::new();
        fields
            .set_non_empty(
                "words_config",
                objects(&words.words_config, |w| Fields::new().with("text", w.text.as_str())),
            )
            .set_non_empty(
                "managed_word_lists_config",
                objects(&words.managed_word_lists_config, |m| {
                    Fields::new().with("type", m.r#type.as_str())
                }),
            );
        body.set_non_empty("word_policy_config", fields);
    }

    body.set_non_empty("tags", &spec.tags);
    Ok(block)
}

fn objects<T>(items: &[T], f: impl Fn(&T) -> Fields) -> Vec<Value> {
    items.iter().map(|item| Value::from(f(item))).collect()
}
