//! Base builder carrying the built-in defaults that must survive an empty
//! file layer.

use crate::config::{DEFAULT_MODULE_REGISTRY, DEFAULT_MODULE_VERSION};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// A builder with the lowest-precedence layer already applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("generator.module_registry", DEFAULT_MODULE_REGISTRY)?
        .set_default("generator.module_version", DEFAULT_MODULE_VERSION)?
        .set_default("validation.profile", "default")
}
