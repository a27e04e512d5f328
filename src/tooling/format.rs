//! Text and JSON rendering of command results.

use crate::pipeline::{GenerateOutcome, LoadReport, ValidateOutcome};
use crate::registry::Registry;
use crate::validation::{ConfigSource, ValidationIssue};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::{json, Map, Value};
use std::path::Path;

/// Output format accepted by every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(format: &str) -> Result<Self, crate::error::ForgeError> {
        match format {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(crate::error::ForgeError::InvalidArgument(format!(
                "Unknown format '{}' (expected 'text' or 'json')",
                other
            ))),
        }
    }
}

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn push_warnings(out: &mut String, load: &LoadReport) {
    let messages = load.messages();
    if messages.is_empty() {
        return;
    }
    out.push_str(&format!("{}\n\n", format_section_heading("Warnings")));
    for message in messages {
        out.push_str(&format!("  {} {}\n", "!".yellow(), message));
    }
    out.push('\n');
}

/// Resources grouped by kind, one table per kind.
pub fn format_inventory_text(load: &LoadReport, registry: &Registry) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Resource Inventory")));
    out.push_str(&format!("  Root: {}\n", load.root.display()));
    out.push_str(&format!("  Files scanned: {}\n\n", load.files.len()));

    let counts = registry.counts();
    if counts.is_empty() {
        out.push_str("No resources found.\n\n");
    }
    for (kind, count) in counts {
        out.push_str(&format!("{} ({})\n\n", format_section_heading(kind.as_str()), count));
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Name", "File", "Doc"]);
        for (name, doc) in registry.get_resources_by_kind(kind) {
            table.add_row(vec![
                name,
                display_relative(&load.root, &doc.source.file_path),
                doc.source.document_index.to_string(),
            ]);
        }
        out.push_str(&format!("{}\n\n", table));
    }

    push_warnings(&mut out, load);
    out.push_str(&format!(
        "Total: {} resource(s) in {} file(s)\n",
        registry.get_total_resource_count(),
        load.files.len()
    ));
    out
}

pub fn format_inventory_json(load: &LoadReport, registry: &Registry) -> String {
    let mut resources = Map::new();
    let mut counts = Map::new();
    for (kind, count) in registry.counts() {
        let entries: Vec<Value> = registry
            .get_resources_by_kind(kind)
            .values()
            .map(|doc| {
                json!({
                    "name": doc.name(),
                    "file": display_relative(&load.root, &doc.source.file_path),
                    "document_index": doc.source.document_index,
                })
            })
            .collect();
        resources.insert(kind.as_str().to_string(), Value::Array(entries));
        counts.insert(kind.as_str().to_string(), json!(count));
    }
    pretty(&json!({
        "root": load.root.display().to_string(),
        "files_scanned": load.files.len(),
        "total_resources": registry.get_total_resource_count(),
        "counts": counts,
        "resources": resources,
        "stats": load.stats,
        "warnings": load.messages(),
    }))
}

fn source_label(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Profile(name) => format!("profile '{}'", name),
        ConfigSource::File(path) => path.display().to_string(),
    }
}

fn issue_table(issues: &[ValidationIssue]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Resource", "Field", "Message"]);
    for issue in issues {
        table.add_row(vec![issue.resource.clone(), issue.field.clone(), issue.message.clone()]);
    }
    table
}

pub fn format_validation_text(outcome: &ValidateOutcome) -> String {
    let report = &outcome.report;
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Resource Validation")));
    out.push_str(&format!("  Rules: {}\n", source_label(&outcome.source)));
    if let Some(team) = &outcome.context.team {
        out.push_str(&format!("  Team: {}\n", team));
    }
    if let Some(environment) = &outcome.context.environment {
        out.push_str(&format!("  Environment: {}\n", environment));
    }
    out.push_str(&format!("  Resources: {}\n\n", report.total_resources));

    let load_errors: Vec<String> = outcome
        .load
        .parse_errors
        .iter()
        .map(ToString::to_string)
        .chain(outcome.load.duplicates.iter().map(ToString::to_string))
        .collect();
    if !load_errors.is_empty() {
        out.push_str(&format!("{}\n\n", format_section_heading("Load errors")));
        for message in &load_errors {
            out.push_str(&format!("  {} {}\n", "x".red(), message));
        }
        out.push('\n');
    }
    if !report.errors.is_empty() {
        out.push_str(&format!("{} ({})\n\n", format_section_heading("Errors"), report.errors.len()));
        out.push_str(&format!("{}\n\n", issue_table(&report.errors)));
    }
    if !report.warnings.is_empty() {
        out.push_str(&format!(
            "{} ({})\n\n",
            format_section_heading("Warnings"),
            report.warnings.len()
        ));
        out.push_str(&format!("{}\n\n", issue_table(&report.warnings)));
    }

    if outcome.success() {
        out.push_str(&format!(
            "{} All {} resource(s) passed validation\n",
            "✓".green(),
            report.valid_resources
        ));
    } else {
        out.push_str(&format!(
            "{} Validation failed with {} error(s); {} of {} resource(s) valid\n",
            "✗".red(),
            outcome.error_count(),
            report.valid_resources,
            report.total_resources
        ));
    }
    out
}

pub fn format_validation_json(outcome: &ValidateOutcome) -> String {
    let report = &outcome.report;
    pretty(&json!({
        "success": outcome.success(),
        "rules": outcome.source,
        "context": outcome.context,
        "total_resources": report.total_resources,
        "valid_resources": report.valid_resources,
        "errors": report.errors,
        "warnings": report.warnings,
        "parse_errors": outcome.load.parse_errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "duplicates": outcome.load.duplicates.iter().map(ToString::to_string).collect::<Vec<_>>(),
    }))
}

pub fn format_generate_text(outcome: &GenerateOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Terraform Generation")));
    out.push_str(&format!("  Resources: {}\n", outcome.resources));
    out.push_str(&format!("  Blocks: {}\n", outcome.files.blocks));
    out.push_str(&format!("  Output: {}\n", outcome.files.output_dir.display()));
    if let Some(packaging) = &outcome.packaging {
        out.push_str(&format!(
            "  Packaged: {} lambda(s), {} schema(s)\n",
            packaging.lambdas, packaging.schemas
        ));
        for error in &packaging.errors {
            out.push_str(&format!("  {} {}\n", "!".yellow(), error));
        }
    }
    out.push('\n');
    push_warnings(&mut out, &outcome.load);
    for file in &outcome.files.files {
        out.push_str(&format!("{} Wrote {}\n", "✓".green(), file.display()));
    }
    out
}

pub fn format_generate_json(outcome: &GenerateOutcome) -> String {
    pretty(&json!({
        "output_dir": outcome.files.output_dir.display().to_string(),
        "files": outcome.files.files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>(),
        "blocks": outcome.files.blocks,
        "resources": outcome.resources,
        "packaging": outcome.packaging,
        "warnings": outcome.load.messages(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("json").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::parse("yaml").is_err());
    }

    #[test]
    fn test_empty_inventory() {
        let load = LoadReport::default();
        let registry = Registry::new();
        let text = format_inventory_text(&load, &registry);
        assert!(text.contains("No resources found."));
        let parsed: Value = serde_json::from_str(&format_inventory_json(&load, &registry)).unwrap();
        assert_eq!(parsed["total_resources"], 0);
        assert!(parsed["warnings"].as_array().unwrap().is_empty());
    }
}
