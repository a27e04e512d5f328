//! Configuration sources, one per precedence layer.

pub mod environment;
pub mod global_file;
pub mod workspace_file;
