//! YAML parser
//!
//! Splits a file into documents, reads each document's `kind`, decodes it
//! into the typed spec for that kind and runs the required-field checks.
//! A bad document is reported and skipped; its siblings still load.

use crate::error::ParseError;
use crate::model::{
    ActionGroupSpec, AgentSpec, AssociationSpec, CustomModuleSpec, Document, GuardrailSpec,
    IamRoleSpec, KnowledgeBaseSpec, LambdaSpec, Metadata, OpenSearchServerlessSpec, PromptSpec,
    ResourceKind, ResourceSpec, SourceLocation, Spec,
};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Result of parsing one file.
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub documents: Vec<Document>,
    pub errors: Vec<ParseError>,
}

/// Raw document text with the line it starts on (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawDocument {
    start_line: usize,
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Envelope<S> {
    #[allow(dead_code)]
    kind: String,
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    metadata: Metadata,
    spec: S,
}

/// Stateless multi-document YAML parser.
#[derive(Debug, Clone, Default)]
pub struct YamlParser;

impl YamlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse every document in `path`.
    pub fn parse_file(&self, path: &Path) -> ParsedFile {
        match std::fs::read_to_string(path) {
            Ok(content) => self.parse_str(&content, path),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to read definition file");
                ParsedFile {
                    path: path.to_path_buf(),
                    documents: Vec::new(),
                    errors: vec![ParseError::Io {
                        file: path.to_path_buf(),
                        message: e.to_string(),
                    }],
                }
            }
        }
    }

    /// Parse documents from already-loaded content attributed to `path`.
    pub fn parse_str(&self, content: &str, path: &Path) -> ParsedFile {
        let mut parsed = ParsedFile {
            path: path.to_path_buf(),
            ..Default::default()
        };
        for (index, raw) in split_documents(content).into_iter().enumerate() {
            match self.parse_document(&raw, path, index) {
                Ok(document) => {
                    debug!(
                        file = %path.display(),
                        kind = %document.kind(),
                        name = %document.name(),
                        "Parsed resource"
                    );
                    parsed.documents.push(document);
                }
                Err(e) => {
                    warn!(file = %path.display(), index, error = %e, "Failed to parse document");
                    parsed.errors.push(e);
                }
            }
        }
        parsed
    }

    /// Parse a batch of files in parallel. Output order matches input order.
    pub fn parse_files(&self, paths: &[PathBuf]) -> Vec<ParsedFile> {
        paths.par_iter().map(|path| self.parse_file(path)).collect()
    }

    fn parse_document(
        &self,
        raw: &RawDocument,
        file: &Path,
        index: usize,
    ) -> Result<Document, ParseError> {
        let syntax = |message: String| ParseError::Syntax {
            file: file.to_path_buf(),
            index,
            message,
        };
        let value: serde_yaml::Value = serde_yaml::from_str(&raw.text).map_err(|e| {
            syntax(format!("{} (document starts at line {})", e, raw.start_line))
        })?;
        let mapping = value
            .as_mapping()
            .ok_or_else(|| syntax("document must be a mapping".to_string()))?;

        let kind_value = mapping.get("kind").ok_or_else(|| ParseError::MissingKind {
            file: file.to_path_buf(),
            index,
        })?;
        let kind_str = match kind_value {
            serde_yaml::Value::String(s) => s.clone(),
            other => format!("{:?}", other),
        };
        let kind = ResourceKind::from_kind(&kind_str).ok_or_else(|| ParseError::UnknownKind {
            file: file.to_path_buf(),
            index,
            kind: kind_str.clone(),
        })?;

        let source = SourceLocation {
            file_path: file.to_path_buf(),
            document_index: index,
        };
        let ctx = DecodeContext { file, index, kind };
        let document = match kind {
            ResourceKind::Agent => ctx.decode::<AgentSpec>(value, source, ResourceSpec::Agent),
            ResourceKind::Lambda => ctx.decode::<LambdaSpec>(value, source, ResourceSpec::Lambda),
            ResourceKind::ActionGroup => {
                ctx.decode::<ActionGroupSpec>(value, source, ResourceSpec::ActionGroup)
            }
            ResourceKind::KnowledgeBase => {
                ctx.decode::<KnowledgeBaseSpec>(value, source, ResourceSpec::KnowledgeBase)
            }
            ResourceKind::Guardrail => {
                ctx.decode::<GuardrailSpec>(value, source, ResourceSpec::Guardrail)
            }
            ResourceKind::Prompt => ctx.decode::<PromptSpec>(value, source, ResourceSpec::Prompt),
            ResourceKind::IamRole => {
                ctx.decode::<IamRoleSpec>(value, source, ResourceSpec::IamRole)
            }
            ResourceKind::CustomModule => {
                ctx.decode::<CustomModuleSpec>(value, source, ResourceSpec::CustomModule)
            }
            ResourceKind::AgentKnowledgeBaseAssociation => {
                ctx.decode::<AssociationSpec>(value, source, ResourceSpec::Association)
            }
            ResourceKind::OpenSearchServerless => ctx.decode::<OpenSearchServerlessSpec>(
                value,
                source,
                ResourceSpec::OpenSearchServerless,
            ),
        }?;
        Ok(document)
    }
}

struct DecodeContext<'a> {
    file: &'a Path,
    index: usize,
    kind: ResourceKind,
}

impl DecodeContext<'_> {
    fn decode<S>(
        &self,
        value: serde_yaml::Value,
        source: SourceLocation,
        wrap: fn(S) -> ResourceSpec,
    ) -> Result<Document, ParseError>
    where
        S: Spec + DeserializeOwned,
    {
        let envelope: Envelope<S> =
            serde_yaml::from_value(value).map_err(|e| ParseError::Decode {
                file: self.file.to_path_buf(),
                index: self.index,
                kind: self.kind,
                message: e.to_string(),
            })?;
        let invalid = |name: &str, message: String| ParseError::Invalid {
            file: self.file.to_path_buf(),
            index: self.index,
            kind: self.kind,
            name: name.to_string(),
            message,
        };
        if envelope.metadata.name.trim().is_empty() {
            return Err(invalid("", "metadata.name is required".to_string()));
        }
        envelope
            .spec
            .check()
            .map_err(|message| invalid(&envelope.metadata.name, message))?;

        let mut document = Document::new(envelope.metadata, wrap(envelope.spec), source);
        document.api_version = envelope.api_version;
        Ok(document)
    }
}

/// Split on `---` separator lines, dropping documents with no content.
fn split_documents(content: &str) -> Vec<RawDocument> {
    let mut documents = Vec::new();
    let mut current = String::new();
    let mut start_line = 1;

    for (i, line) in content.lines().enumerate() {
        if is_separator(line) {
            push_document(&mut documents, &mut current, start_line);
            start_line = i + 2;
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    push_document(&mut documents, &mut current, start_line);
    documents
}

fn push_document(documents: &mut Vec<RawDocument>, current: &mut String, start_line: usize) {
    let text = std::mem::take(current);
    let has_content = text.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#') && trimmed != "..."
    });
    if has_content {
        documents.push(RawDocument { start_line, text });
    }
}

fn is_separator(line: &str) -> bool {
    let line = line.trim_end();
    match line.strip_prefix("---") {
        Some(rest) => rest.is_empty() || rest.trim_start().starts_with('#'),
        None => false,
    }
}
