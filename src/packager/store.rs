//! Object store abstraction for packaged artifacts.

use crate::error::PackagingError;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Destination for packaged archives and schemas. Returns the object URI.
pub trait ObjectStore: Send + Sync {
    fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<String, PackagingError>;

    fn upload_content(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<String, PackagingError>;
}

/// One completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRecord {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub size: u64,
}

pub fn object_uri(bucket: &str, key: &str) -> String {
    format!("s3://{}/{}", bucket, key)
}

/// Store that mirrors the bucket layout under a local directory:
/// `<root>/<bucket>/<key>`.
pub struct LocalObjectStore {
    root: PathBuf,
    uploads: Mutex<Vec<UploadRecord>>,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Uploads performed so far, in completion order.
    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads.lock().clone()
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.root.join(bucket);
        for part in key.split('/').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }

    fn write_object(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<String, PackagingError> {
        let upload_error = |message: String| PackagingError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };
        if bucket.is_empty() {
            return Err(upload_error("bucket name is empty".to_string()));
        }
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| upload_error(e.to_string()))?;
        }
        fs::write(&path, content).map_err(|e| upload_error(e.to_string()))?;
        debug!(bucket, key, size = content.len(), "Stored object");
        self.uploads.lock().push(UploadRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            size: content.len() as u64,
        });
        Ok(object_uri(bucket, key))
    }
}

impl ObjectStore for LocalObjectStore {
    fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<String, PackagingError> {
        let content = fs::read(path).map_err(|e| PackagingError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        self.write_object(bucket, key, &content, "application/octet-stream")
    }

    fn upload_content(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<String, PackagingError> {
        self.write_object(bucket, key, content, content_type)
    }
}
