//! Prompt spec: a managed prompt with one or more model variants.

use super::common::{FreeForm, Tags};
use super::{Reference, ReferenceSite, ResourceKind, Spec};
use serde::{Deserialize, Serialize};

pub const TEMPLATE_TEXT: &str = "TEXT";
pub const TEMPLATE_CHAT: &str = "CHAT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PromptSpec {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_variant: Option<String>,
    #[serde(default)]
    pub customer_encryption_key_arn: Option<String>,
    #[serde(default)]
    pub input_variables: Vec<InputVariable>,
    #[serde(default)]
    pub variants: Vec<PromptVariant>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InputVariable {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PromptVariant {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub template_type: Option<String>,
    #[serde(default)]
    pub template_configuration: Option<TemplateConfiguration>,
    #[serde(default)]
    pub inference_configuration: Option<InferenceConfiguration>,
    #[serde(default)]
    pub gen_ai_resource: Option<GenAiResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TemplateConfiguration {
    #[serde(default)]
    pub text: Option<TextTemplate>,
    #[serde(default)]
    pub chat: Option<ChatTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextTemplate {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub input_variables: Vec<InputVariable>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatTemplate {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub system: Vec<ContentBlock>,
    #[serde(default)]
    pub tool_configuration: Option<ToolConfiguration>,
    #[serde(default)]
    pub input_variables: Vec<InputVariable>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContentBlock {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolConfiguration {
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Tool {
    #[serde(default)]
    pub tool_spec: ToolSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<ToolInputSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolInputSchema {
    #[serde(default)]
    pub json: FreeForm,
}

/// Exactly one of `auto`, `any` or `tool` is expected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolChoice {
    #[serde(default)]
    pub auto: Option<FreeForm>,
    #[serde(default)]
    pub any: Option<FreeForm>,
    #[serde(default)]
    pub tool: Option<SpecificTool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SpecificTool {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InferenceConfiguration {
    #[serde(default)]
    pub text: Option<TextInferenceConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextInferenceConfiguration {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenAiResource {
    #[serde(default)]
    pub agent: Option<GenAiAgent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenAiAgent {
    #[serde(default)]
    pub agent_name: Reference,
    #[serde(default)]
    pub agent_arn: Option<String>,
}

impl Spec for PromptSpec {
    const KIND: ResourceKind = ResourceKind::Prompt;

    fn reference_sites(&self) -> Vec<ReferenceSite<'_>> {
        self.variants
            .iter()
            .enumerate()
            .filter_map(|(i, variant)| {
                let agent = variant.gen_ai_resource.as_ref()?.agent.as_ref()?;
                Some(
                    ReferenceSite::new(
                        format!("spec.variants[{}].genAiResource.agent.agentName", i),
                        &agent.agent_name,
                        ResourceKind::Agent,
                    )
                    .with_external("agentArn", &agent.agent_arn),
                )
            })
            .collect()
    }

    fn check(&self) -> Result<(), String> {
        if self.variants.is_empty() {
            return Err("at least one variant is required".to_string());
        }
        for (i, variant) in self.variants.iter().enumerate() {
            if variant.name.is_empty() {
                return Err(format!("variants[{}].name is required", i));
            }
            if variant.model_id.is_empty() {
                return Err(format!("variants[{}].modelId is required", i));
            }
            if let Some(template_type) = variant.template_type.as_deref() {
                if template_type != TEMPLATE_TEXT && template_type != TEMPLATE_CHAT {
                    return Err(format!(
                        "variants[{}].templateType must be TEXT or CHAT, got '{}'",
                        i, template_type
                    ));
                }
            }
        }
        if let Some(default) = self.default_variant.as_deref() {
            if !self.variants.iter().any(|v| v.name == default) {
                return Err(format!("defaultVariant '{}' is not a declared variant", default));
            }
        }
        Ok(())
    }

    fn tags(&self) -> Option<&Tags> {
        Some(&self.tags)
    }
}
