//! Environment variable source: FORGE__ prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Keys whose environment values are comma-separated lists.
const LIST_KEYS: [&str; 3] = ["scan.include", "scan.exclude", "packaging.exclude"];

/// Add the environment overlay, e.g. `FORGE__GENERATOR__REGION=eu-west-1`
/// or `FORGE__SCAN__EXCLUDE=**/drafts/**,**/vendor/**`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut source = Environment::with_prefix("FORGE")
        .separator("__")
        .try_parsing(true)
        .list_separator(",");
    for key in LIST_KEYS {
        source = source.with_list_parse_key(key);
    }
    Ok(builder.add_source(source))
}
