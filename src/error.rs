//! Error types for every stage of the pipeline.
//!
//! Each stage owns its own enum so callers can tell recoverable failures
//! (a single bad document, a single unreadable directory) from fatal ones.
//! `ForgeError` is the boundary type returned by the pipeline and the CLI.

use crate::model::{ReferenceTarget, ResourceKind};
use std::path::PathBuf;
use thiserror::Error;

/// Directory walk failures.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Cannot read scan root {path:?}: {source}")]
    UnreadableRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan root is not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to read {path:?}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("Scan cancelled")]
    Cancelled,
}

/// Failures decoding a single document. Always tied to a source location.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("{}: cannot read file: {message}", .file.display())]
    Io { file: PathBuf, message: String },

    #[error("{} (document {index}): invalid YAML: {message}", .file.display())]
    Syntax {
        file: PathBuf,
        index: usize,
        message: String,
    },

    #[error("{} (document {index}): missing 'kind' field", .file.display())]
    MissingKind { file: PathBuf, index: usize },

    #[error("{} (document {index}): unknown resource kind '{kind}'", .file.display())]
    UnknownKind {
        file: PathBuf,
        index: usize,
        kind: String,
    },

    #[error("{} (document {index}): failed to decode {kind}: {message}", .file.display())]
    Decode {
        file: PathBuf,
        index: usize,
        kind: ResourceKind,
        message: String,
    },

    #[error("{} (document {index}): invalid {kind} '{name}': {message}", .file.display())]
    Invalid {
        file: PathBuf,
        index: usize,
        kind: ResourceKind,
        name: String,
        message: String,
    },
}

impl ParseError {
    pub fn file(&self) -> &PathBuf {
        match self {
            ParseError::Io { file, .. }
            | ParseError::Syntax { file, .. }
            | ParseError::MissingKind { file, .. }
            | ParseError::UnknownKind { file, .. }
            | ParseError::Decode { file, .. }
            | ParseError::Invalid { file, .. } => file,
        }
    }
}

/// A second document claimed an identity that is already registered.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("duplicate {kind} '{name}': defined in {existing:?}, duplicated in {duplicate:?}")]
pub struct DuplicateResourceError {
    pub kind: ResourceKind,
    pub name: String,
    pub existing: PathBuf,
    pub duplicate: PathBuf,
}

/// Referential integrity violations found by dependency validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DependencyError {
    #[error("{kind} '{name}' field {field}: {target} '{reference}' not found")]
    Unresolved {
        kind: ResourceKind,
        name: String,
        field: String,
        target: ReferenceTarget,
        reference: String,
    },

    #[error("{kind} '{name}' field {field}: '{reference}' is a {found}, expected {target}")]
    WrongKind {
        kind: ResourceKind,
        name: String,
        field: String,
        target: ReferenceTarget,
        reference: String,
        found: ResourceKind,
    },

    #[error(
        "{kind} '{name}' field {field}: both reference '{reference}' and {external} are set"
    )]
    AmbiguousReference {
        kind: ResourceKind,
        name: String,
        field: String,
        reference: String,
        external: String,
    },
}

impl DependencyError {
    /// Identity of the document that owns the broken reference.
    pub fn owner(&self) -> (ResourceKind, &str) {
        match self {
            DependencyError::Unresolved { kind, name, .. }
            | DependencyError::WrongKind { kind, name, .. }
            | DependencyError::AmbiguousReference { kind, name, .. } => (*kind, name.as_str()),
        }
    }
}

/// Failures projecting the registry into the module tree.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("module registry is not configured (set generator.module_registry)")]
    MissingModuleRegistry,

    #[error("{kind} '{name}' field {field}: {target} '{reference}' not found")]
    UnresolvedReference {
        kind: ResourceKind,
        name: String,
        field: String,
        target: ReferenceTarget,
        reference: String,
    },

    #[error("{kind} '{name}' field {field}: '{reference}' is a {found}, expected {target}")]
    WrongKind {
        kind: ResourceKind,
        name: String,
        field: String,
        target: ReferenceTarget,
        reference: String,
        found: ResourceKind,
    },

    #[error(
        "{kind} '{name}' field {field}: both reference '{reference}' and {external} are set"
    )]
    AmbiguousReference {
        kind: ResourceKind,
        name: String,
        field: String,
        reference: String,
        external: String,
    },

    #[error("{block_type} label '{label}' is produced by both {first} and {second}")]
    DuplicateLabel {
        block_type: String,
        label: String,
        first: String,
        second: String,
    },

    #[error("{kind} '{name}': {message}")]
    InvalidSpec {
        kind: ResourceKind,
        name: String,
        message: String,
    },

    #[error("{kind} '{name}': artifact unavailable: {message}")]
    MissingArtifact {
        kind: ResourceKind,
        name: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("generation failed with {count} error(s)")]
    Failed {
        count: usize,
        errors: Vec<GenerationError>,
    },
}

impl From<DependencyError> for GenerationError {
    fn from(err: DependencyError) -> Self {
        match err {
            DependencyError::Unresolved {
                kind,
                name,
                field,
                target,
                reference,
            } => GenerationError::UnresolvedReference {
                kind,
                name,
                field,
                target,
                reference,
            },
            DependencyError::WrongKind {
                kind,
                name,
                field,
                target,
                reference,
                found,
            } => GenerationError::WrongKind {
                kind,
                name,
                field,
                target,
                reference,
                found,
            },
            DependencyError::AmbiguousReference {
                kind,
                name,
                field,
                reference,
                external,
            } => GenerationError::AmbiguousReference {
                kind,
                name,
                field,
                reference,
                external,
            },
        }
    }
}

/// Failures bundling or uploading artifacts.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("Lambda '{name}': source directory {path:?} does not exist")]
    DirectoryMissing { name: String, path: PathBuf },

    #[error("{name}: I/O error on {path:?}: {source}")]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{name}: archive error: {message}")]
    Archive { name: String, message: String },

    #[error("upload to s3://{bucket}/{key} failed: {message}")]
    Upload {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("ActionGroup '{name}': no OpenAPI schema file found in {dir:?}")]
    SchemaNotFound { name: String, dir: PathBuf },
}

impl PackagingError {
    pub fn resource_name(&self) -> Option<&str> {
        match self {
            PackagingError::DirectoryMissing { name, .. }
            | PackagingError::Io { name, .. }
            | PackagingError::Archive { name, .. }
            | PackagingError::SchemaNotFound { name, .. } => Some(name),
            PackagingError::Upload { .. } => None,
        }
    }
}

/// Top-level error returned by the pipeline and the CLI.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("{count} document(s) failed to parse")]
    Parse {
        count: usize,
        errors: Vec<ParseError>,
    },

    #[error("{count} duplicate resource(s)")]
    Duplicate {
        count: usize,
        errors: Vec<DuplicateResourceError>,
    },

    #[error("{count} dependency error(s)")]
    Dependency {
        count: usize,
        errors: Vec<DependencyError>,
    },

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Packaging error: {0}")]
    Packaging(#[from] PackagingError),

    /// `report` is the rendered validation output, printed before the error.
    #[error("Validation failed with {count} error(s)")]
    Validation { count: usize, report: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ForgeError {
    /// Number of underlying failures.
    pub fn error_count(&self) -> usize {
        match self {
            ForgeError::Parse { count, .. }
            | ForgeError::Duplicate { count, .. }
            | ForgeError::Dependency { count, .. }
            | ForgeError::Validation { count, .. } => *count,
            ForgeError::Generation(GenerationError::Failed { count, .. }) => *count,
            _ => 1,
        }
    }

    /// One line per underlying failure, for the aggregate variants.
    pub fn details(&self) -> Vec<String> {
        match self {
            ForgeError::Parse { errors, .. } => errors.iter().map(ToString::to_string).collect(),
            ForgeError::Duplicate { errors, .. } => errors.iter().map(ToString::to_string).collect(),
            ForgeError::Dependency { errors, .. } => errors.iter().map(ToString::to_string).collect(),
            ForgeError::Generation(GenerationError::Failed { errors, .. }) => {
                errors.iter().map(ToString::to_string).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl From<config::ConfigError> for ForgeError {
    fn from(err: config::ConfigError) -> Self {
        ForgeError::ConfigError(err.to_string())
    }
}
