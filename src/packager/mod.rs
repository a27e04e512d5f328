//! Artifact packaging
//!
//! Bundles directory-source Lambdas into content-addressed ZIP archives and
//! uploads action group API schemas, recording where each artifact landed.
//! The resulting [`PackagingReport`] becomes the generator's context so
//! emitted modules point at the uploaded objects.

pub mod lambda;
pub mod schema;
pub mod store;

pub use lambda::LambdaPackager;
pub use schema::SchemaExtractor;
pub use store::{LocalObjectStore, ObjectStore, UploadRecord};

use crate::error::{ForgeError, PackagingError};
use crate::generator::GenerationContext;
use crate::registry::Registry;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub fn default_exclude_patterns() -> Vec<String> {
    [
        "*.yml",
        "*.yaml",
        "*.md",
        "*.txt",
        ".git",
        ".gitignore",
        ".DS_Store",
        "__pycache__",
        "*.pyc",
        "*.pyo",
        ".pytest_cache",
        ".coverage",
        "node_modules",
        ".npm",
        ".env",
        ".env.*",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone)]
pub struct PackagerConfig {
    pub bucket: String,
    pub key_prefix: String,
    /// Local copy of every archive, if set.
    pub staging_dir: Option<PathBuf>,
    pub exclude_patterns: Vec<String>,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            key_prefix: String::new(),
            staging_dir: None,
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LambdaPackage {
    pub name: String,
    pub bucket: String,
    pub key: String,
    pub uri: String,
    /// blake3 hex digest of the archive.
    pub hash: String,
    pub size: u64,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaPackage {
    pub name: String,
    pub bucket: String,
    pub key: String,
    pub uri: String,
    pub content_type: String,
    pub source_file: PathBuf,
}

#[derive(Debug, Default)]
pub struct PackagingReport {
    pub lambda_packages: Vec<LambdaPackage>,
    pub schema_packages: Vec<SchemaPackage>,
    pub errors: Vec<PackagingError>,
}

impl PackagingReport {
    pub fn merge(&mut self, other: PackagingReport) {
        self.lambda_packages.extend(other.lambda_packages);
        self.schema_packages.extend(other.schema_packages);
        self.errors.extend(other.errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Convert into name-keyed lookups for generation. Failures are kept,
    /// keyed by resource name.
    pub fn into_context(self) -> GenerationContext {
        let mut context = GenerationContext::default();
        for package in self.lambda_packages {
            context.lambda_packages.insert(package.name.clone(), package);
        }
        for package in self.schema_packages {
            context.schema_packages.insert(package.name.clone(), package);
        }
        for error in self.errors {
            let name = error
                .resource_name()
                .map(str::to_string)
                .unwrap_or_else(|| "<upload>".to_string());
            context.failures.insert(name, error.to_string());
        }
        context
    }
}

/// Runs Lambda bundling then schema extraction against one store.
pub struct Packager {
    lambdas: LambdaPackager,
    schemas: SchemaExtractor,
}

impl Packager {
    pub fn new(config: PackagerConfig, store: Arc<dyn ObjectStore>) -> Result<Self, ForgeError> {
        if config.bucket.is_empty() {
            return Err(ForgeError::ConfigError(
                "packaging.bucket must be set when packaging is enabled".to_string(),
            ));
        }
        Ok(Self {
            lambdas: LambdaPackager::new(config.clone(), Arc::clone(&store)),
            schemas: SchemaExtractor::new(config, store),
        })
    }

    pub fn run(&self, registry: &Registry) -> PackagingReport {
        let mut report = self.lambdas.package_all(registry);
        report.merge(self.schemas.extract_all(registry));
        info!(
            lambdas = report.lambda_packages.len(),
            schemas = report.schema_packages.len(),
            errors = report.errors.len(),
            "Packaging finished"
        );
        report
    }
}
