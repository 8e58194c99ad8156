use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

/// Highest verbosity level children understand.
const MAX_VERBOSE: u8 = 4;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/xlockd/config.toml` on Unix, via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("xlockd").join("config.toml")
    }

    /// Loads configuration from `path`.
    ///
    /// - If the file doesn't exist, returns `Config::default()`.
    /// - If the file exists, parses it as TOML and validates.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - The blank timeout is at least one second
    /// - Verbosity is within what children accept
    /// - Renderer and authenticator are named
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeouts.blank_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "blank_timeout_secs must be at least 1".to_string(),
            });
        }

        if self.logging.verbose > MAX_VERBOSE {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "verbose must be between 0 and {}, got {}",
                    MAX_VERBOSE, self.logging.verbose
                ),
            });
        }

        let programs = &self.programs;
        for (name, value) in [
            ("renderer", &programs.renderer),
            ("authenticator", &programs.authenticator),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: format!("programs.{} must not be empty", name),
                });
            }
        }
        if matches!(&programs.idle_helper, Some(helper) if helper.trim().is_empty()) {
            return Err(ConfigError::ValidationError {
                message: "programs.idle_helper must not be empty when set".to_string(),
            });
        }

        Ok(())
    }
}
