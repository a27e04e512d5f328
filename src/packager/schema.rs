//! OpenAPI schema discovery for action groups.

use super::lambda::join_key;
use super::store::ObjectStore;
use super::{PackagerConfig, PackagingReport, SchemaPackage};
use crate::error::PackagingError;
use crate::model::{Document, ResourceKind, ResourceSpec};
use crate::registry::Registry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Candidate file stems, in search order.
const SCHEMA_STEMS: [&str; 3] = ["openapi", "schema", "api"];
const SCHEMA_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

pub struct SchemaExtractor {
    config: PackagerConfig,
    store: Arc<dyn ObjectStore>,
}

impl SchemaExtractor {
    pub fn new(config: PackagerConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, store }
    }

    /// Upload the schema of every action group that declares an `apiSchema`
    /// without an inline payload.
    pub fn extract_all(&self, registry: &Registry) -> PackagingReport {
        let mut report = PackagingReport::default();
        for doc in registry
            .get_resources_by_kind(ResourceKind::ActionGroup)
            .into_values()
        {
            match self.extract(&doc) {
                Ok(Some(package)) => report.schema_packages.push(package),
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Schema extraction failed");
                    report.errors.push(e);
                }
            }
        }
        info!(
            extracted = report.schema_packages.len(),
            failed = report.errors.len(),
            "Schema extraction completed"
        );
        report
    }

    /// `Ok(None)` when the action group needs no upload.
    pub fn extract(&self, doc: &Document) -> Result<Option<SchemaPackage>, PackagingError> {
        let ResourceSpec::ActionGroup(spec) = &doc.spec else {
            return Ok(None);
        };
        let Some(schema) = &spec.api_schema else {
            return Ok(None);
        };
        if schema.payload.as_deref().is_some_and(|p| !p.is_empty()) {
            return Ok(None);
        }

        let name = doc.name().to_string();
        let dir = doc
            .source
            .directory()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let Some(file) = find_schema_file(&dir) else {
            let declared = schema.s3.as_ref().is_some_and(|s3| {
                s3.s3_bucket_name.as_deref().is_some_and(|b| !b.is_empty())
                    && s3.s3_object_key.as_deref().is_some_and(|k| !k.is_empty())
            });
            if declared {
                debug!(action_group = %name, "Using declared schema location");
                return Ok(None);
            }
            return Err(PackagingError::SchemaNotFound { name, dir });
        };

        let extension = file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("json")
            .to_string();
        let content_type = content_type_for(&extension);
        let content = std::fs::read(&file).map_err(|e| PackagingError::Io {
            name: name.clone(),
            path: file.clone(),
            source: e,
        })?;
        let key = join_key(
            &self.config.key_prefix,
            &format!("schemas/{}/openapi.{}", name, extension),
        );
        let uri = self
            .store
            .upload_content(&self.config.bucket, &key, &content, content_type)?;
        info!(action_group = %name, uri = %uri, "Uploaded API schema");

        Ok(Some(SchemaPackage {
            name,
            bucket: self.config.bucket.clone(),
            key,
            uri,
            content_type: content_type.to_string(),
            source_file: file,
        }))
    }
}

/// First `openapi|schema|api` `.json|.yaml|.yml` file in `dir`.
pub fn find_schema_file(dir: &Path) -> Option<PathBuf> {
    SCHEMA_STEMS
        .iter()
        .flat_map(|stem| {
            SCHEMA_EXTENSIONS
                .iter()
                .map(move |ext| dir.join(format!("{}.{}", stem, ext)))
        })
        .find(|candidate| candidate.is_file())
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "json" => "application/json",
        _ => "application/x-yaml",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_openapi_wins_over_schema() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("schema.json"), "{}").unwrap();
        fs::write(temp.path().join("openapi.yaml"), "openapi: 3.0.0").unwrap();
        let found = find_schema_file(temp.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "openapi.yaml");
    }

    #[test]
    fn test_json_precedes_yaml_for_same_stem() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("api.yml"), "a: 1").unwrap();
        fs::write(temp.path().join("api.json"), "{}").unwrap();
        let found = find_schema_file(temp.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "api.json");
        assert_eq!(content_type_for("yml"), "application/x-yaml");
    }

    #[test]
    fn test_no_schema_file() {
        let temp = TempDir::new().unwrap();
        assert!(find_schema_file(temp.path()).is_none());
    }
}
