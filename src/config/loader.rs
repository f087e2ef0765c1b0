//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{Mode, ServerConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable selecting the mode.
pub const MODE_ENV: &str = "NODE_ENV";
/// Environment variable suppressing listener binding.
pub const TEST_BUILD_ENV: &str = "SSR_TEST_BUILD";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load a configuration file without validating it.
pub fn read_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Override mode and test-build marker from environment lookups.
///
/// The mode always follows the environment; a file can only turn the
/// test-build marker on, never off.
pub fn apply_env<F>(config: &mut ServerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let node_env = lookup(MODE_ENV);
    config.mode = Mode::from_env_value(node_env.as_deref());

    let test_flag = lookup(TEST_BUILD_ENV).is_some_and(|v| !v.is_empty());
    if node_env.as_deref() == Some("test") || test_flag {
        config.test_build = true;
    }
}

/// Defaults, then the optional file, then the process environment.
pub fn load_layered(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let mut config = match path {
        Some(p) => read_config(p)?,
        None => ServerConfig::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
