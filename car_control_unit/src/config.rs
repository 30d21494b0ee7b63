//! TOML configuration loader with validation.
//!
//! Loads a [`ControlConfig`] through [`ConfigLoader`] and runs the bound
//! checks that keep both control-law variants inside their integer widths.
//! A missing default file is not an error: the calibrated defaults apply.

use std::path::Path;

use car_common::config::{ConfigError, ConfigLoader};
use car_common::consts::DEFAULT_CONFIG_PATH;
use car_common::control::config::ControlConfig;
use tracing::{info, warn};

/// Load and validate the control configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ControlConfig, ConfigError> {
    let config = ControlConfig::load(path)?;
    config.validate()?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(toml: &str) -> Result<ControlConfig, ConfigError> {
    let config = ControlConfig::from_toml(toml)?;
    config.validate()?;
    Ok(config)
}

/// Resolve the configuration the binary runs with.
///
/// An explicit path must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
/// used when present and the built-in defaults otherwise.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ControlConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match load_config(Path::new(DEFAULT_CONFIG_PATH)) {
        Err(ConfigError::FileNotFound) => {
            warn!("No configuration at {DEFAULT_CONFIG_PATH}, using built-in defaults");
            let config = ControlConfig::default();
            config.validate()?;
            Ok(config)
        }
        other => other,
    }
}
