//! Source composition for [`ForgeConfig`](super::ForgeConfig).

pub mod merge_policy;
pub mod service;
