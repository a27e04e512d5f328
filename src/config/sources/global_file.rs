//! Global config file source (`$XDG_CONFIG_HOME/bedrock-forge/config.toml`).

use crate::config::xdg;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use tracing::debug;

/// Add the global file when the config home can be determined. A missing
/// file is skipped.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match xdg::global_config_path() {
        Ok(path) => {
            debug!(file = %path.display(), "Global config layer");
            Ok(builder.add_source(File::from(path).required(false)))
        }
        Err(e) => {
            debug!(error = %e, "No global config layer");
            Ok(builder)
        }
    }
}
