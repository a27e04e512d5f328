//! Guardrail spec.

use super::common::Tags;
use super::{ResourceKind, Spec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GuardrailSpec {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub blocked_input_messaging: Option<String>,
    #[serde(default)]
    pub blocked_outputs_messaging: Option<String>,
    #[serde(default)]
    pub content_policy_config: Option<ContentPolicyConfig>,
    #[serde(default)]
    pub sensitive_information_policy_config: Option<SensitiveInformationPolicyConfig>,
    #[serde(default)]
    pub contextual_grounding_policy_config: Option<ContextualGroundingPolicyConfig>,
    #[serde(default)]
    pub topic_policy_config: Option<TopicPolicyConfig>,
    #[serde(default)]
    pub word_policy_config: Option<WordPolicyConfig>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContentPolicyConfig {
    #[serde(default)]
    pub filters_config: Vec<ContentFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContentFilter {
    #[serde(default, rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub input_strength: String,
    #[serde(default)]
    pub output_strength: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SensitiveInformationPolicyConfig {
    #[serde(default)]
    pub pii_entities_config: Vec<PiiEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PiiEntity {
    #[serde(default, rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContextualGroundingPolicyConfig {
    #[serde(default)]
    pub filters_config: Vec<GroundingFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GroundingFilter {
    #[serde(default, rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TopicPolicyConfig {
    #[serde(default)]
    pub topics_config: Vec<Topic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Topic {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default, rename = "type")]
    pub r#type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WordPolicyConfig {
    #[serde(default)]
    pub words_config: Vec<WordConfig>,
    #[serde(default)]
    pub managed_word_lists_config: Vec<ManagedWordList>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WordConfig {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManagedWordList {
    #[serde(default, rename = "type")]
    pub r#type: String,
}

impl GuardrailSpec {
    fn has_policy(&self) -> bool {
        self.content_policy_config.is_some()
            || self.sensitive_information_policy_config.is_some()
            || self.contextual_grounding_policy_config.is_some()
            || self.topic_policy_config.is_some()
            || self.word_policy_config.is_some()
    }
}

impl Spec for GuardrailSpec {
    const KIND: ResourceKind = ResourceKind::Guardrail;

    fn check(&self) -> Result<(), String> {
        if !self.has_policy() {
            return Err("at least one policy configuration is required".to_string());
        }
        for (i, topic) in self
            .topic_policy_config
            .iter()
            .flat_map(|t| t.topics_config.iter())
            .enumerate()
        {
            if topic.name.is_empty() || topic.definition.is_empty() {
                return Err(format!(
                    "topicPolicyConfig.topicsConfig[{}] needs a name and definition",
                    i
                ));
            }
        }
        Ok(())
    }

    fn tags(&self) -> Option<&Tags> {
        Some(&self.tags)
    }
}
