//! Pipeline
//!
//! Scan, parse, register, then optionally package and generate. Loading
//! never stops at a bad file: scan, parse and duplicate errors are returned
//! in a [`LoadReport`] and the caller decides what blocks.

use crate::config::ForgeConfig;
use crate::error::{DuplicateResourceError, ForgeError, ParseError, ScanError};
use crate::generator::{GeneratedFiles, Generator};
use crate::packager::{LocalObjectStore, Packager, PackagingReport};
use crate::parser::YamlParser;
use crate::registry::Registry;
use crate::scanner::{ScanStats, Scanner};
use crate::validation::{ConfigSource, ValidationConfig, ValidationContext, ValidationReport, Validator};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything recoverable that happened while loading a tree.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    pub stats: ScanStats,
    pub scan_errors: Vec<ScanError>,
    pub parse_errors: Vec<ParseError>,
    pub duplicates: Vec<DuplicateResourceError>,
    pub documents: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.scan_errors.is_empty() && self.parse_errors.is_empty() && self.duplicates.is_empty()
    }

    /// Every problem as a display string, scan errors first.
    pub fn messages(&self) -> Vec<String> {
        self.scan_errors
            .iter()
            .map(ToString::to_string)
            .chain(self.parse_errors.iter().map(ToString::to_string))
            .chain(self.duplicates.iter().map(ToString::to_string))
            .collect()
    }
}

/// Per-call switches layered over the configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    pub skip_packaging: bool,
    pub allow_parse_errors: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PackagingSummary {
    pub lambdas: usize,
    pub schemas: usize,
    pub errors: Vec<String>,
}

impl From<&PackagingReport> for PackagingSummary {
    fn from(report: &PackagingReport) -> Self {
        Self {
            lambdas: report.lambda_packages.len(),
            schemas: report.schema_packages.len(),
            errors: report.errors.iter().map(ToString::to_string).collect(),
        }
    }
}

pub struct GenerateOutcome {
    pub load: LoadReport,
    pub resources: usize,
    pub packaging: Option<PackagingSummary>,
    pub files: GeneratedFiles,
}

pub struct ValidateOutcome {
    pub load: LoadReport,
    pub source: ConfigSource,
    pub context: ValidationContext,
    pub report: ValidationReport,
}

impl ValidateOutcome {
    /// Policy, dependency, parse and duplicate errors all fail validation.
    pub fn success(&self) -> bool {
        self.report.success() && self.load.parse_errors.is_empty() && self.load.duplicates.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.report.errors.len() + self.load.parse_errors.len() + self.load.duplicates.len()
    }
}

pub struct Pipeline {
    config: ForgeConfig,
    workspace_root: PathBuf,
    cancel: Option<Arc<AtomicBool>>,
}

impl Pipeline {
    pub fn new(config: ForgeConfig, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            workspace_root: workspace_root.into(),
            cancel: None,
        }
    }

    /// Stop scanning once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Scan `root`, parse every file in parallel and register documents in
    /// file order, so the first definition of a duplicate always wins.
    pub fn load(&self, root: &Path) -> Result<(Registry, LoadReport), ForgeError> {
        let scan = &self.config.scan;
        let mut scanner = Scanner::new(&scan.include, &scan.exclude)?.follow_symlinks(scan.follow_symlinks);
        if let Some(flag) = &self.cancel {
            scanner = scanner.with_cancellation(Arc::clone(flag));
        }
        let scanned = scanner.scan_directory(root)?;

        let parsed = YamlParser::new().parse_files(&scanned.files);
        let registry = Registry::new();
        let mut report = LoadReport {
            root: root.to_path_buf(),
            files: scanned.files,
            stats: scanned.stats,
            scan_errors: scanned.errors,
            ..LoadReport::default()
        };

        for file in parsed {
            for error in &file.errors {
                warn!(file = %file.path.display(), error = %error, "Skipping document");
            }
            report.parse_errors.extend(file.errors);
            report.duplicates.extend(registry.add_all(file.documents));
        }
        report.documents = registry.get_total_resource_count();

        info!(
            root = %root.display(),
            files = report.files.len(),
            documents = report.documents,
            parse_errors = report.parse_errors.len(),
            duplicates = report.duplicates.len(),
            "Loaded definitions"
        );
        Ok((registry, report))
    }

    /// Package artifacts into the local object store when packaging is
    /// enabled.
    pub fn package(&self, registry: &Registry) -> Result<Option<PackagingReport>, ForgeError> {
        let section = &self.config.packaging;
        if !section.enabled {
            debug!("Packaging disabled");
            return Ok(None);
        }
        let store = Arc::new(LocalObjectStore::new(section.resolve_store_dir(&self.workspace_root)));
        let packager = Packager::new(section.packager_config(&self.workspace_root), store)?;
        let report = packager.run(registry);
        for error in &report.errors {
            warn!(error = %error, "Packaging failed");
        }
        Ok(Some(report))
    }

    /// Full run: load, check, package, generate and write.
    ///
    /// Parse errors block unless allowed; duplicates and dependency errors
    /// always block.
    pub fn generate(
        &self,
        root: &Path,
        output_dir: Option<&Path>,
        options: GenerateOptions,
    ) -> Result<GenerateOutcome, ForgeError> {
        let (registry, load) = self.load(root)?;

        let allow_parse_errors = options.allow_parse_errors || self.config.pipeline.allow_parse_errors;
        if !load.parse_errors.is_empty() && !allow_parse_errors {
            return Err(ForgeError::Parse {
                count: load.parse_errors.len(),
                errors: load.parse_errors,
            });
        }
        if !load.duplicates.is_empty() {
            return Err(ForgeError::Duplicate {
                count: load.duplicates.len(),
                errors: load.duplicates,
            });
        }

        let dependency_errors = registry.validate_dependencies();
        if !dependency_errors.is_empty() {
            for error in &dependency_errors {
                warn!(error = %error, "Unresolved reference");
            }
            return Err(ForgeError::Dependency {
                count: dependency_errors.len(),
                errors: dependency_errors,
            });
        }

        let packaging = if options.skip_packaging {
            None
        } else {
            self.package(&registry)?
        };
        let summary = packaging.as_ref().map(PackagingSummary::from);
        let context = packaging.map(PackagingReport::into_context).unwrap_or_default();

        let generator = Generator::new(&registry, self.config.generator.clone())?
            .with_context(context)
            .require_artifacts(self.config.packaging.fail_on_error);
        let tree = generator.generate()?;
        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.generator.resolve_output_dir(root));
        let files = generator.write(&tree, &output_dir)?;

        Ok(GenerateOutcome {
            resources: registry.get_total_resource_count(),
            load,
            packaging: summary,
            files,
        })
    }

    /// Load `root` and run policy plus dependency validation.
    pub fn validate(
        &self,
        root: &Path,
        explicit_config: Option<&Path>,
        profile: Option<&str>,
    ) -> Result<ValidateOutcome, ForgeError> {
        let mut section = self.config.validation.clone();
        if let Some(profile) = profile {
            section.profile = profile.to_string();
        }
        let (rules, source) = ValidationConfig::resolve(&section, explicit_config, root)?;
        let validator = Validator::new(rules)?;

        let (registry, load) = self.load(root)?;
        let canonical = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let context = ValidationContext::from_path(&canonical);
        let report = validator.validate_registry(&registry, &context);

        Ok(ValidateOutcome {
            load,
            source,
            context,
            report,
        })
    }
}
