//! Configuration file loading and validation.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::ConfigError;
use crate::types::RespackConfig;

/// Name of the configuration file looked up in a directory.
pub const CONFIG_FILE: &str = "respack.toml";

/// Loads and validates `<dir>/respack.toml`.
pub fn load_config(dir: &Path) -> Result<RespackConfig, ConfigError> {
    let content = std::fs::read_to_string(dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `respack.toml` document.
pub fn load_config_from_str(content: &str) -> Result<RespackConfig, ConfigError> {
    let config: RespackConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
///
/// Any other failure, including a malformed file, is still returned.
pub fn load_config_or_default(dir: &Path) -> Result<RespackConfig, ConfigError> {
    match load_config(dir) {
        Err(ConfigError::IoError(err)) if err.kind() == ErrorKind::NotFound => {
            tracing::warn!(
                "no {CONFIG_FILE} in {}, using default settings: {err}",
                dir.display()
            );
            Ok(RespackConfig::default())
        }
        other => other,
    }
}

/// Checks value ranges that the types alone cannot express.
fn validate_config(config: &RespackConfig) -> Result<(), ConfigError> {
    if config.codec.deflate_level > 9 {
        return Err(ConfigError::ValidationError(format!(
            "codec.deflate_level must be between 0 and 9, got {}",
            config.codec.deflate_level
        )));
    }
    if config.codec.internal_max_chain == 0 {
        return Err(ConfigError::ValidationError(
            "codec.internal_max_chain must be at least 1".to_string(),
        ));
    }
    Ok(())
}
