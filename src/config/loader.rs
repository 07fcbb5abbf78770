//! Configuration loader for YAML files
//!
//! Non-secret settings come from YAML; key secrets are always taken
//! from the environment before validation.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::SdkError;

use super::types::SdkConfig;

/// Load configuration from a YAML file
///
/// # Arguments
/// * `path` - Path to the configuration YAML file
///
/// # Returns
/// * `Ok(SdkConfig)` - Parsed config with secrets applied and validated
/// * `Err(SdkError)` - File not found, parse error, missing secret or validation failure
pub fn load_config(path: &Path) -> Result<SdkConfig, SdkError> {
    if !path.exists() {
        return Err(SdkError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut config: SdkConfig = serde_yaml::from_reader(reader).map_err(|e| {
        SdkError::Config(format!("YAML parse error in '{}': {}", path.display(), e))
    })?;

    config.apply_env_secrets()?;
    config.validate()?;

    Ok(config)
}

/// Load configuration from a YAML string
///
/// Secrets are still read from the environment.
pub fn load_config_from_str(yaml_content: &str) -> Result<SdkConfig, SdkError> {
    let mut config: SdkConfig = serde_yaml::from_str(yaml_content)
        .map_err(|e| SdkError::Config(format!("YAML parse error: {}", e)))?;

    config.apply_env_secrets()?;
    config.validate()?;

    Ok(config)
}

// ============================================================================
// Unit Tests
// ============================================================================
