//! Directory scanner
//!
//! Walks a definition tree and returns the candidate YAML files in lexical
//! order. Exclude patterns prune whole directories before they are entered;
//! include patterns select files. Unreadable entries are logged and
//! collected, only an unreadable root aborts the scan.

use crate::error::ScanError;
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Counters reported alongside the file list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub directories_visited: usize,
    pub files_seen: usize,
    pub files_matched: usize,
    pub entries_pruned: usize,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    /// Matched files, lexically ordered.
    pub files: Vec<PathBuf>,
    /// Per-entry failures that did not stop the walk.
    pub errors: Vec<ScanError>,
    pub stats: ScanStats,
}

/// A compiled glob plus its directory form (`a/**` also matches `a`).
#[derive(Debug, Clone)]
struct GlobRule {
    pattern: Pattern,
    dir_pattern: Option<Pattern>,
}

impl GlobRule {
    fn compile(raw: &str) -> Result<Self, ScanError> {
        let invalid = |e: glob::PatternError| ScanError::InvalidPattern {
            pattern: raw.to_string(),
            message: e.to_string(),
        };
        let pattern = Pattern::new(raw).map_err(invalid)?;
        let dir_pattern = match raw.strip_suffix("/**") {
            Some(stripped) if !stripped.is_empty() => Some(Pattern::new(stripped).map_err(invalid)?),
            _ => None,
        };
        Ok(Self {
            pattern,
            dir_pattern,
        })
    }

    fn matches(&self, relative: &str, basename: &str, is_dir: bool) -> bool {
        if self.pattern.matches_with(relative, MATCH_OPTIONS)
            || self.pattern.matches_with(basename, MATCH_OPTIONS)
        {
            return true;
        }
        if is_dir {
            if let Some(dir_pattern) = &self.dir_pattern {
                return dir_pattern.matches_with(relative, MATCH_OPTIONS)
                    || dir_pattern.matches_with(basename, MATCH_OPTIONS);
            }
        }
        false
    }
}

/// Configured directory walker.
pub struct Scanner {
    include: Vec<GlobRule>,
    exclude: Vec<GlobRule>,
    follow_symlinks: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl Scanner {
    /// Compile the include and exclude globs.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ScanError> {
        Ok(Self {
            include: include
                .iter()
                .map(|p| GlobRule::compile(p))
                .collect::<Result<_, _>>()?,
            exclude: exclude
                .iter()
                .map(|p| GlobRule::compile(p))
                .collect::<Result<_, _>>()?,
            follow_symlinks: false,
            cancel: None,
        })
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Abort the walk with [`ScanError::Cancelled`] once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    fn is_excluded(&self, relative: &str, basename: &str, is_dir: bool) -> bool {
        self.exclude
            .iter()
            .any(|rule| rule.matches(relative, basename, is_dir))
    }

    fn is_included(&self, relative: &str, basename: &str) -> bool {
        if self.include.is_empty() {
            return has_yaml_extension(basename);
        }
        self.include
            .iter()
            .any(|rule| rule.matches(relative, basename, false))
    }

    /// Walk `root` and collect matching files.
    pub fn scan_directory(&self, root: &Path) -> Result<ScanResult, ScanError> {
        let metadata = std::fs::metadata(root).map_err(|e| ScanError::UnreadableRoot {
            path: root.to_path_buf(),
            source: e,
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        std::fs::read_dir(root).map_err(|e| ScanError::UnreadableRoot {
            path: root.to_path_buf(),
            source: e,
        })?;
        let root = dunce::canonicalize(root).map_err(|e| ScanError::UnreadableRoot {
            path: root.to_path_buf(),
            source: e,
        })?;

        let mut result = ScanResult::default();
        let mut pruned = 0usize;

        let walker = WalkDir::new(&root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let relative = relative_path(&root, entry.path());
                let basename = entry.file_name().to_string_lossy();
                let excluded = self.is_excluded(&relative, &basename, entry.file_type().is_dir());
                if excluded {
                    debug!(path = %relative, "Skipping excluded entry");
                    pruned += 1;
                }
                !excluded
            });

        for entry in walker {
            if self.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.clone());
                    warn!(path = %path.display(), error = %e, "Error accessing path");
                    result.errors.push(ScanError::Walk {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                result.stats.directories_visited += 1;
                continue;
            }
            result.stats.files_seen += 1;

            let relative = relative_path(&root, entry.path());
            let basename = entry.file_name().to_string_lossy();
            if self.is_included(&relative, &basename) {
                debug!(path = %relative, "Found definition file");
                result.files.push(entry.into_path());
            }
        }

        result.stats.files_matched = result.files.len();
        result.stats.entries_pruned = pruned;
        info!(
            root = %root.display(),
            files = result.files.len(),
            errors = result.errors.len(),
            "Completed directory scan"
        );
        Ok(result)
    }
}

/// Scan `root` with the given include and exclude globs.
pub fn scan_directory(
    root: &Path,
    include: &[String],
    exclude: &[String],
) -> Result<ScanResult, ScanError> {
    Scanner::new(include, exclude)?.scan_directory(root)
}

/// Default exclusions applied by the CLI. Policy files are not resource
/// definitions.
pub fn default_exclude_patterns() -> Vec<String> {
    [
        "**/node_modules/**",
        "**/.git/**",
        "**/.terraform/**",
        "**/vendor/**",
        "**/.vscode/**",
        "**/.idea/**",
        "**/.bedrock-forge/**",
        "validation.yml",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn has_yaml_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".yml") || lower.ends_with(".yaml")
}

/// Root-relative path with forward slashes.
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "kind: Agent\n").unwrap();
    }

    fn names(result: &ScanResult, root: &Path) -> Vec<String> {
        let root = dunce::canonicalize(root).unwrap();
        result
            .files
            .iter()
            .map(|p| relative_path(&root, p))
            .collect()
    }

    #[test]
    fn test_scan_returns_yaml_files_in_lexical_order() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "b/agent.yaml");
        touch(temp.path(), "a/z.yml");
        touch(temp.path(), "a/readme.md");
        touch(temp.path(), "c.YAML");

        let result = scan_directory(temp.path(), &[], &[]).unwrap();
        assert_eq!(names(&result, temp.path()), vec!["a/z.yml", "b/agent.yaml", "c.YAML"]);
        assert_eq!(result.stats.files_seen, 4);
        assert_eq!(result.stats.files_matched, 3);
    }

    #[test]
    fn test_exclude_prunes_nested_directories() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "node_modules/pkg/x.yml");
        touch(temp.path(), "svc/node_modules/y.yml");
        touch(temp.path(), "svc/.terraform/z.yml");
        touch(temp.path(), "svc/keep.yml");

        let result =
            scan_directory(temp.path(), &[], &default_exclude_patterns()).unwrap();
        assert_eq!(names(&result, temp.path()), vec!["svc/keep.yml"]);
        assert!(result.stats.entries_pruned >= 3);
    }

    #[test]
    fn test_include_patterns_select_files() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "agents/a.yml");
        touch(temp.path(), "lambdas/l.yml");

        let include = vec!["agents/*.yml".to_string()];
        let result = scan_directory(temp.path(), &include, &[]).unwrap();
        assert_eq!(names(&result, temp.path()), vec!["agents/a.yml"]);
    }

    #[test]
    fn test_basename_exclude_matches_files() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a/validation.yml");
        touch(temp.path(), "a/agent.yml");

        let exclude = vec!["validation.yml".to_string()];
        let result = scan_directory(temp.path(), &[], &exclude).unwrap();
        assert_eq!(names(&result, temp.path()), vec!["a/agent.yml"]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let err = scan_directory(&temp.path().join("nope"), &[], &[]).unwrap_err();
        assert!(matches!(err, ScanError::UnreadableRoot { .. }));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = Scanner::new(&["[".to_string()], &[]).err().unwrap();
        assert!(matches!(err, ScanError::InvalidPattern { .. }));
    }

    #[test]
    fn test_cancelled_scan_stops() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.yml");
        let flag = Arc::new(AtomicBool::new(true));
        let err = Scanner::new(&[], &[])
            .unwrap()
            .with_cancellation(flag)
            .scan_directory(temp.path())
            .unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
    }

    #[test]
    fn test_scan_is_idempotent() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "x/one.yml");
        touch(temp.path(), "two.yaml");
        let first = scan_directory(temp.path(), &[], &[]).unwrap();
        let second = scan_directory(temp.path(), &[], &[]).unwrap();
        assert_eq!(first.files, second.files);
    }
}
