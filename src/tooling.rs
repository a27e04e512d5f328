//! Tooling
//!
//! The `bedrock-forge` command line: argument parsing, command dispatch and
//! text/JSON rendering of results.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};
