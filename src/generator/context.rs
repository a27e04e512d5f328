//! Packaging results the generator substitutes into modules.

use crate::packager::{LambdaPackage, SchemaPackage};
use std::collections::BTreeMap;

/// Name-keyed artifact lookups. Empty when packaging was skipped.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    pub lambda_packages: BTreeMap<String, LambdaPackage>,
    pub schema_packages: BTreeMap<String, SchemaPackage>,
    /// Resource name to packaging error message.
    pub failures: BTreeMap<String, String>,
}

impl GenerationContext {
    pub fn lambda_package(&self, name: &str) -> Option<&LambdaPackage> {
        self.lambda_packages.get(name)
    }

    pub fn schema_package(&self, name: &str) -> Option<&SchemaPackage> {
        self.schema_packages.get(name)
    }

    pub fn failure(&self, name: &str) -> Option<&str> {
        self.failures.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.lambda_packages.is_empty() && self.schema_packages.is_empty() && self.failures.is_empty()
    }
}
