//! HCL writer.
//!
//! Two-space indentation, `=` aligned across runs of single-line
//! attributes, one blank line between top-level blocks. Object keys that
//! are not identifiers are quoted. Literal `${` and `%{` are escaped so
//! user text never turns into a template.

use super::ir::{Block, Body, BodyItem, Fields, ModuleTree, Value};
use std::fmt::Write;

const INDENT: &str = "  ";

/// Render the whole tree as a `.tf` file.
pub fn render(tree: &ModuleTree) -> String {
    let mut out = String::new();
    for (i, block) in tree.blocks.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_block(&mut out, block, 0);
    }
    out
}

/// Render a single block; used by tests and diagnostics.
pub fn render_block(block: &Block) -> String {
    let mut out = String::new();
    write_block(&mut out, block, 0);
    out
}

fn write_block(out: &mut String, block: &Block, depth: usize) {
    indent(out, depth);
    out.push_str(&block.block_type);
    for label in &block.labels {
        out.push(' ');
        out.push_str(&quote(label));
    }
    out.push_str(" {\n");
    write_body(out, &block.body, depth + 1);
    indent(out, depth);
    out.push_str("}\n");
}

fn write_body(out: &mut String, body: &Body, depth: usize) {
    let items = body.items();
    let mut i = 0;
    while i < items.len() {
        match &items[i] {
            BodyItem::Block(block) => {
                write_block(out, block, depth);
                i += 1;
            }
            BodyItem::Attribute(..) => {
                let run_end = attribute_run_end(items, i);
                let pairs: Vec<(String, &Value)> = items[i..run_end]
                    .iter()
                    .filter_map(|item| match item {
                        BodyItem::Attribute(k, v) => Some((k.clone(), v)),
                        BodyItem::Block(_) => None,
                    })
                    .collect();
                write_attributes(out, &pairs, depth);
                i = run_end;
            }
        }
    }
}

fn attribute_run_end(items: &[BodyItem], start: usize) -> usize {
    let mut end = start;
    while end < items.len() && matches!(items[end], BodyItem::Attribute(..)) {
        end += 1;
    }
    end
}

/// Write `key = value` lines. Consecutive single-line values share one
/// alignment column; a multi-line value ends the run.
fn write_attributes(out: &mut String, pairs: &[(String, &Value)], depth: usize) {
    let mut start = 0;
    while start < pairs.len() {
        let mut end = start;
        while end < pairs.len() && is_single_line(pairs[end].1) {
            end += 1;
        }
        let width = pairs[start..end]
            .iter()
            .map(|(k, _)| k.chars().count())
            .max()
            .unwrap_or(0);
        for (key, value) in &pairs[start..end] {
            indent(out, depth);
            let _ = write!(out, "{:<width$} = ", key, width = width);
            write_value(out, value, depth);
            out.push('\n');
        }
        if end < pairs.len() {
            let (key, value) = &pairs[end];
            indent(out, depth);
            let _ = write!(out, "{} = ", key);
            write_value(out, value, depth);
            out.push('\n');
            end += 1;
        }
        start = end;
    }
}

fn object_pairs(fields: &Fields) -> Vec<(String, &Value)> {
    fields.iter().map(|(k, v)| (object_key(k), v)).collect()
}

fn is_single_line(value: &Value) -> bool {
    match value {
        Value::Object(fields) => fields.is_empty(),
        Value::List(items) => items.iter().all(|item| !item.is_collection() || item.is_empty_collection()),
        _ => true,
    }
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(&quote(s)),
        Value::Interpolation(expr) => {
            out.push_str("\"${");
            out.push_str(expr);
            out.push_str("}\"");
        }
        Value::Traversal(expr) => out.push_str(expr),
        Value::List(items) if items.is_empty() => out.push_str("[]"),
        Value::List(items) if is_single_line(value) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item, depth);
            }
            out.push(']');
        }
        Value::List(items) => {
            out.push_str("[\n");
            for item in items {
                indent(out, depth + 1);
                write_value(out, item, depth + 1);
                out.push_str(",\n");
            }
            indent(out, depth);
            out.push(']');
        }
        Value::Object(fields) if fields.is_empty() => out.push_str("{}"),
        Value::Object(fields) => {
            out.push_str("{\n");
            write_attributes(out, &object_pairs(fields), depth + 1);
            indent(out, depth);
            out.push('}');
        }
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn object_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Quote a literal string, escaping template sequences.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
