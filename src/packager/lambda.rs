//! Lambda bundling.
//!
//! A directory-source Lambda is archived from the directory holding its
//! YAML file. Entries are added in sorted order with a fixed timestamp and
//! mode, so identical trees give byte-identical archives and the same
//! content-addressed key.

use super::store::ObjectStore;
use super::{LambdaPackage, PackagerConfig, PackagingReport};
use crate::error::PackagingError;
use crate::model::{Document, ResourceKind, ResourceSpec};
use crate::registry::Registry;
use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Hex characters of the content hash used in object keys.
const KEY_HASH_LEN: usize = 16;

pub struct LambdaPackager {
    config: PackagerConfig,
    store: Arc<dyn ObjectStore>,
    excludes: Vec<Pattern>,
}

/// In-memory archive plus what went into it.
#[derive(Debug)]
pub struct Archive {
    pub bytes: Vec<u8>,
    pub entries: Vec<String>,
}

impl LambdaPackager {
    pub fn new(config: PackagerConfig, store: Arc<dyn ObjectStore>) -> Self {
        let excludes = config
            .exclude_patterns
            .iter()
            .filter_map(|raw| match Pattern::new(raw) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(pattern = %raw, error = %e, "Ignoring invalid packaging exclude pattern");
                    None
                }
            })
            .collect();
        Self {
            config,
            store,
            excludes,
        }
    }

    /// Package every directory-source Lambda. A failure never stops the
    /// other Lambdas; it is recorded in the report.
    pub fn package_all(&self, registry: &Registry) -> PackagingReport {
        let lambdas: Vec<_> = registry
            .get_resources_by_kind(ResourceKind::Lambda)
            .into_values()
            .filter(|doc| match &doc.spec {
                ResourceSpec::Lambda(spec) => {
                    if !spec.is_directory_source() {
                        debug!(lambda = %doc.name(), source = %spec.code.source, "Skipping non-directory Lambda");
                    }
                    spec.is_directory_source()
                }
                _ => false,
            })
            .collect();

        let results: Vec<_> = lambdas.par_iter().map(|doc| self.package(doc)).collect();
        let mut report = PackagingReport::default();
        for result in results {
            match result {
                Ok(package) => report.lambda_packages.push(package),
                Err(e) => {
                    warn!(error = %e, "Lambda packaging failed");
                    report.errors.push(e);
                }
            }
        }
        info!(
            packaged = report.lambda_packages.len(),
            failed = report.errors.len(),
            "Lambda packaging completed"
        );
        report
    }

    pub fn package(&self, doc: &Document) -> Result<LambdaPackage, PackagingError> {
        let name = doc.name().to_string();
        let dir = doc
            .source
            .directory()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        if !dir.is_dir() {
            return Err(PackagingError::DirectoryMissing { name, path: dir });
        }

        let archive = self.build_archive(&name, &dir)?;
        let hash = content_hash(&archive.bytes);
        let key = lambda_key(&self.config.key_prefix, &name, &hash);

        if let Some(staging) = &self.config.staging_dir {
            let staged = staging.join(format!("{}.zip", name));
            std::fs::create_dir_all(staging)
                .and_then(|_| std::fs::write(&staged, &archive.bytes))
                .map_err(|e| PackagingError::Io {
                    name: name.clone(),
                    path: staged.clone(),
                    source: e,
                })?;
        }

        let uri = self
            .store
            .upload_content(&self.config.bucket, &key, &archive.bytes, "application/zip")?;
        info!(lambda = %name, uri = %uri, files = archive.entries.len(), "Packaged Lambda");

        Ok(LambdaPackage {
            name,
            bucket: self.config.bucket.clone(),
            key,
            uri,
            hash,
            size: archive.bytes.len() as u64,
            file_count: archive.entries.len(),
        })
    }

    /// Zip `dir` deterministically, skipping excluded entries.
    pub fn build_archive(&self, name: &str, dir: &Path) -> Result<Archive, PackagingError> {
        let archive_error = |message: String| PackagingError::Archive {
            name: name.to_string(),
            message,
        };
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut entries = Vec::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_excluded(dir, entry.path()));

        for entry in walker {
            let entry = entry.map_err(|e| PackagingError::Io {
                name: name.to_string(),
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk error")),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = relative_name(dir, entry.path());
            let content = std::fs::read(entry.path()).map_err(|e| PackagingError::Io {
                name: name.to_string(),
                path: entry.path().to_path_buf(),
                source: e,
            })?;
            writer
                .start_file(relative.clone(), options)
                .map_err(|e| archive_error(e.to_string()))?;
            writer
                .write_all(&content)
                .map_err(|e| archive_error(e.to_string()))?;
            entries.push(relative);
        }

        if entries.is_empty() {
            return Err(archive_error(format!(
                "no files to package in {}",
                dir.display()
            )));
        }
        let cursor = writer.finish().map_err(|e| archive_error(e.to_string()))?;
        Ok(Archive {
            bytes: cursor.into_inner(),
            entries,
        })
    }

    fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        let relative = relative_name(root, path);
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.excludes.iter().any(|pattern| {
            pattern.matches_with(&basename, MATCH_OPTIONS)
                || pattern.matches_with(&relative, MATCH_OPTIONS)
        })
    }
}

/// blake3 digest of `bytes`, hex encoded.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// `{prefix}/lambdas/{name}/{hash16}.zip`; an empty prefix is omitted.
pub fn lambda_key(prefix: &str, name: &str, hash: &str) -> String {
    let short = &hash[..hash.len().min(KEY_HASH_LEN)];
    join_key(prefix, &format!("lambdas/{}/{}.zip", name, short))
}

pub(crate) fn join_key(prefix: &str, rest: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", prefix, rest)
    }
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packager::store::LocalObjectStore;
    use std::fs;
    use tempfile::TempDir;

    fn packager(store_root: &Path) -> LambdaPackager {
        let config = PackagerConfig {
            bucket: "artifacts".to_string(),
            key_prefix: "forge".to_string(),
            ..PackagerConfig::default()
        };
        LambdaPackager::new(config, Arc::new(LocalObjectStore::new(store_root)))
    }

    fn write_tree(dir: &Path) {
        fs::create_dir_all(dir.join("lib")).unwrap();
        fs::create_dir_all(dir.join("__pycache__")).unwrap();
        fs::write(dir.join("lambda.yml"), "kind: Lambda\n").unwrap();
        fs::write(dir.join("app.py"), "def handler(e, c):\n    return e\n").unwrap();
        fs::write(dir.join("lib/util.py"), "X = 1\n").unwrap();
        fs::write(dir.join("__pycache__/app.cpython-311.pyc"), "bytecode").unwrap();
        fs::write(dir.join("README.md"), "docs").unwrap();
    }

    #[test]
    fn test_archive_is_deterministic_and_excludes_defaults() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("fn");
        write_tree(&src);
        let packager = packager(&temp.path().join("store"));

        let first = packager.build_archive("fn", &src).unwrap();
        let second = packager.build_archive("fn", &src).unwrap();
        assert_eq!(first.entries, vec!["app.py", "lib/util.py"]);
        assert_eq!(content_hash(&first.bytes), content_hash(&second.bytes));
    }

    #[test]
    fn test_hash_changes_with_content() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("fn");
        write_tree(&src);
        let packager = packager(&temp.path().join("store"));
        let before = content_hash(&packager.build_archive("fn", &src).unwrap().bytes);
        fs::write(src.join("app.py"), "def handler(e, c):\n    return None\n").unwrap();
        let after = content_hash(&packager.build_archive("fn", &src).unwrap().bytes);
        assert_ne!(before, after);
    }

    #[test]
    fn test_lambda_key_layout() {
        let hash = "0123456789abcdef0123456789abcdef";
        assert_eq!(
            lambda_key("forge/", "orders", hash),
            "forge/lambdas/orders/0123456789abcdef.zip"
        );
        assert_eq!(lambda_key("", "orders", hash), "lambdas/orders/0123456789abcdef.zip");
    }

    #[test]
    fn test_empty_directory_is_an_archive_error() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("empty");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("lambda.yaml"), "kind: Lambda\n").unwrap();
        let err = packager(&temp.path().join("store"))
            .build_archive("empty", &src)
            .unwrap_err();
        assert!(matches!(err, PackagingError::Archive { .. }));
    }
}
