//! Integration tests for bedrock-forge

mod cli_contracts;
mod generation_pipeline;
mod support;
mod validation_policies;
