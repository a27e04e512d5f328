//! Terraform JSON writer.
//!
//! Blocks nest by type and then by each label (`module.<name>`,
//! `resource.<type>.<name>`); repeated blocks at the same address become an
//! array. Interpolations keep their `${}` wrapper, traversals are emitted as
//! bare strings (the form `depends_on` and `type` take in JSON syntax).

use super::ir::{Block, Body, BodyItem, ModuleTree, Value};
use crate::error::GenerationError;
use serde_json::{Map, Value as Json};

pub fn render(tree: &ModuleTree) -> Result<String, GenerationError> {
    let mut root = Map::new();
    for block in &tree.blocks {
        insert_block(&mut root, block);
    }
    let mut text = serde_json::to_string_pretty(&Json::Object(root))
        .map_err(|e| GenerationError::Serialize(e.to_string()))?;
    text.push('\n');
    Ok(text)
}

fn insert_block(target: &mut Map<String, Json>, block: &Block) {
    let mut path: Vec<&str> = vec![block.block_type.as_str()];
    path.extend(block.labels.iter().map(String::as_str));
    let body = body_to_json(&block.body);
    insert_at(target, &path, body);
}

fn insert_at(target: &mut Map<String, Json>, path: &[&str], body: Json) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    if rest.is_empty() {
        match target.get_mut(*head) {
            Some(Json::Array(items)) => items.push(body),
            Some(existing) => {
                let previous = existing.take();
                *existing = Json::Array(vec![previous, body]);
            }
            None => {
                target.insert(head.to_string(), body);
            }
        }
        return;
    }
    let entry = target
        .entry(head.to_string())
        .or_insert_with(|| Json::Object(Map::new()));
    if let Json::Object(map) = entry {
        insert_at(map, rest, body);
    }
}

fn body_to_json(body: &Body) -> Json {
    let mut map = Map::new();
    for item in body.items() {
        match item {
            BodyItem::Attribute(key, value) => {
                map.insert(key.clone(), value_to_json(value));
            }
            BodyItem::Block(block) => insert_block(&mut map, block),
        }
    }
    Json::Object(map)
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => Json::Number(n.clone()),
        Value::String(s) => Json::String(escape_template(s)),
        Value::Interpolation(expr) => Json::String(format!("${{{}}}", expr)),
        Value::Traversal(expr) => Json::String(expr.clone()),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Object(fields) => Json::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

/// JSON strings are templates too; escape literal `${` and `%{`.
fn escape_template(s: &str) -> String {
    s.replace("${", "$${").replace("%{", "%%{")
}
