//! Small structures shared by several resource specs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource tags. Ordered so every projection iterates them the same way.
pub type Tags = BTreeMap<String, String>;

/// Free-form YAML carried through to the output untouched (principals,
/// conditions, JSON schemas, module variables).
pub type FreeForm = serde_yaml::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Timeouts {
    #[serde(default)]
    pub create: Option<String>,
    #[serde(default)]
    pub update: Option<String>,
    #[serde(default)]
    pub delete: Option<String>,
}

impl Timeouts {
    pub fn is_empty(&self) -> bool {
        self.create.is_none() && self.update.is_none() && self.delete.is_none()
    }
}

/// A field that accepts either a single string or a list of strings
/// (IAM `Action` and `Resource`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl Default for StringOrList {
    fn default() -> Self {
        StringOrList::Many(Vec::new())
    }
}

impl StringOrList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s.clone()],
            StringOrList::Many(items) => items.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            StringOrList::One(s) => s.is_empty(),
            StringOrList::Many(items) => items.is_empty(),
        }
    }
}

/// Returns true when an optional string field carries a non-empty value.
pub(crate) fn is_set(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.is_empty()).unwrap_or(false)
}

/// Non-empty value of an optional string field.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_or_list_accepts_both_shapes() {
        let one: StringOrList = serde_yaml::from_str("\"s3:GetObject\"").unwrap();
        assert_eq!(one.to_vec(), vec!["s3:GetObject".to_string()]);
        let many: StringOrList = serde_yaml::from_str("[a, b]").unwrap();
        assert_eq!(many.to_vec(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_non_empty_filters_blank_values() {
        assert_eq!(non_empty(&Some(String::new())), None);
        assert_eq!(non_empty(&Some("x".to_string())), Some("x"));
        assert!(!is_set(&None));
    }
}
