//! Bedrock Forge: Terraform generation for Bedrock resource definitions
//!
//! YAML documents describing agents, knowledge bases, Lambdas and related
//! resources are scanned from a directory tree, parsed into a registry,
//! checked for unresolved references and policy violations, packaged, and
//! rendered as a single Terraform module tree.

pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod model;
pub mod packager;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod scanner;
pub mod tooling;
pub mod validation;
