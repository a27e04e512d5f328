//! Workspace-relative path resolution.

pub mod storage_paths;
