//! Intermediate representation of the generated configuration.
//!
//! Generators build [`Block`]s out of [`Value`]s; the HCL and JSON writers
//! are pure functions over the resulting [`ModuleTree`]. Attribute and
//! object-key order is insertion order, so output order is decided by the
//! generators alone.

use indexmap::IndexMap;
use std::collections::BTreeMap;

use crate::model::{FreeForm, StringOrList};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    /// Literal string. Template sequences are escaped on output.
    String(String),
    /// Expression rendered as `"${expr}"`.
    Interpolation(String),
    /// Bare expression (`depends_on` entries, type keywords).
    Traversal(String),
    List(Vec<Value>),
    Object(Fields),
}

impl Value {
    pub fn interpolation(expr: impl Into<String>) -> Self {
        Value::Interpolation(expr.into())
    }

    pub fn traversal(expr: impl Into<String>) -> Self {
        Value::Traversal(expr.into())
    }

    pub fn empty_object() -> Self {
        Value::Object(Fields::new())
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Value::List(_) | Value::Object(_))
    }

    pub fn is_empty_collection(&self) -> bool {
        match self {
            Value::List(items) => items.is_empty(),
            Value::Object(fields) => fields.is_empty(),
            _ => false,
        }
    }

    /// Convert free-form YAML into a value. Mapping keys that are not
    /// scalars are dropped; tags are unwrapped.
    pub fn from_yaml(value: &FreeForm) -> Self {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(*b),
            serde_yaml::Value::Number(n) => yaml_number(n),
            serde_yaml::Value::String(s) => Value::String(s.clone()),
            serde_yaml::Value::Sequence(items) => {
                Value::List(items.iter().map(Value::from_yaml).collect())
            }
            serde_yaml::Value::Mapping(map) => {
                let mut fields = Fields::new();
                for (key, item) in map {
                    if let Some(key) = yaml_key(key) {
                        fields.set(key, Value::from_yaml(item));
                    }
                }
                Value::Object(fields)
            }
            serde_yaml::Value::Tagged(tagged) => Value::from_yaml(&tagged.value),
        }
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else {
        n.as_f64().map(Value::from).unwrap_or(Value::Null)
    }
}

pub(crate) fn yaml_key(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::String).collect())
    }
}

impl From<&[String]> for Value {
    fn from(items: &[String]) -> Self {
        Value::List(items.iter().map(Value::from).collect())
    }
}

impl From<&Vec<String>> for Value {
    fn from(items: &Vec<String>) -> Self {
        Value::from(items.as_slice())
    }
}

impl From<&BTreeMap<String, String>> for Value {
    fn from(map: &BTreeMap<String, String>) -> Self {
        let mut fields = Fields::new();
        for (k, v) in map {
            fields.set(k.clone(), v);
        }
        Value::Object(fields)
    }
}

/// IAM-style `Action`/`Resource`: a single string stays a string.
impl From<&StringOrList> for Value {
    fn from(value: &StringOrList) -> Self {
        match value {
            StringOrList::One(s) => Value::from(s),
            StringOrList::Many(items) => Value::from(items),
        }
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Value::Object(fields)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Ordered key/value pairs: object values and block attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(IndexMap<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Set `key`, replacing an earlier value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn set_opt<V: Into<Value>>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    /// Set a string only when it is present and non-empty.
    pub fn set_str(&mut self, key: impl Into<String>, value: &Option<String>) -> &mut Self {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            self.set(key, value);
        }
        self
    }

    /// Set a list or map only when it has entries.
    pub fn set_non_empty(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if !value.is_empty_collection() {
            self.set(key, value);
        }
        self
    }

    /// By-value form of [`Fields::set`] for building nested objects.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyItem {
    Attribute(String, Value),
    Block(Block),
}

/// Contents of a block: attributes and nested blocks, interleaved in the
/// order they were added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    items: Vec<BodyItem>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        for item in &mut self.items {
            if let BodyItem::Attribute(existing, slot) = item {
                if *existing == key {
                    *slot = value;
                    return self;
                }
            }
        }
        self.items.push(BodyItem::Attribute(key, value));
        self
    }

    pub fn set_opt<V: Into<Value>>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    pub fn set_str(&mut self, key: impl Into<String>, value: &Option<String>) -> &mut Self {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            self.set(key, value);
        }
        self
    }

    pub fn set_non_empty(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if !value.is_empty_collection() {
            self.set(key, value);
        }
        self
    }

    pub fn push_block(&mut self, block: Block) -> &mut Self {
        self.items.push(BodyItem::Block(block));
        self
    }

    pub fn items(&self) -> &[BodyItem] {
        &self.items
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.items.iter().find_map(|item| match item {
            BodyItem::Attribute(k, v) if k == key => Some(v),
            _ => None,
        })
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter_map(|item| match item {
            BodyItem::Block(block) => Some(block),
            BodyItem::Attribute(..) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub block_type: String,
    pub labels: Vec<String>,
    pub body: Body,
}

impl Block {
    pub fn new(block_type: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            block_type: block_type.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            body: Body::new(),
        }
    }

    pub fn module(label: impl Into<String>) -> Self {
        Self {
            block_type: "module".to_string(),
            labels: vec![label.into()],
            body: Body::new(),
        }
    }

    pub fn resource(resource_type: &str, label: impl Into<String>) -> Self {
        Self {
            block_type: "resource".to_string(),
            labels: vec![resource_type.to_string(), label.into()],
            body: Body::new(),
        }
    }

    /// `type.label...` address of the block.
    pub fn address(&self) -> String {
        let mut parts = vec![self.block_type.as_str()];
        parts.extend(self.labels.iter().map(String::as_str));
        parts.join(".")
    }
}

/// The root configuration: top-level blocks in output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleTree {
    pub blocks: Vec<Block>,
}

impl ModuleTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn extend(&mut self, blocks: impl IntoIterator<Item = Block>) {
        self.blocks.extend(blocks);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Labels of the `module` blocks, in output order.
    pub fn module_labels(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter(|b| b.block_type == "module")
            .filter_map(|b| b.labels.first().map(String::as_str))
            .collect()
    }

    pub fn find(&self, block_type: &str, labels: &[&str]) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|b| b.block_type == block_type && b.labels.iter().map(String::as_str).eq(labels.iter().copied()))
    }

    pub fn module(&self, label: &str) -> Option<&Block> {
        self.find("module", &[label])
    }

    /// Number of top-level blocks per block type.
    pub fn count_by_type(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for block in &self.blocks {
            *counts.entry(block.block_type.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_set_replaces_in_place() {
        let mut body = Body::new();
        body.set("a", "1").set("b", "2").set("a", "3");
        assert_eq!(body.items().len(), 2);
        assert_eq!(body.attribute("a"), Some(&Value::from("3")));
    }

    #[test]
    fn test_set_non_empty_skips_empty_collections() {
        let mut fields = Fields::new();
        fields
            .set_non_empty("tags", &BTreeMap::new())
            .set_non_empty("layers", Vec::<String>::new())
            .set_non_empty("names", vec!["x".to_string()]);
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("names"));
    }

    #[test]
    fn test_from_yaml_preserves_mapping_order() {
        let yaml: FreeForm = serde_yaml::from_str("b: 1\na: [true, x]\nc: 1.5\n").unwrap();
        let Value::Object(fields) = Value::from_yaml(&yaml) else {
            panic!("expected object");
        };
        let keys: Vec<&String> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(fields.get("b"), Some(&Value::from(1u32)));
        assert_eq!(fields.get("c"), Some(&Value::from(1.5)));
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(Value::from(f64::NAN), Value::Null);
    }
}
