//! Configuration storage with change detection.
//!
//! The daemon is single-threaded, so the store is a plain owned value. The
//! file is re-read only when its modification time moves.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::loader::ConfigError;
use crate::config::types::Config;

pub struct ConfigStore {
    config: Config,
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl ConfigStore {
    /// Create a ConfigStore from initial config and path.
    pub fn new(config: Config, path: PathBuf) -> Self {
        let modified = modified_at(&path);
        Self {
            config,
            path,
            modified,
        }
    }

    /// Load `path` and remember its modification time.
    pub fn open(path: PathBuf) -> Result<Self, ConfigError> {
        let config = Config::load_from(&path)?;
        Ok(Self::new(config, path))
    }

    pub fn get(&self) -> &Config {
        &self.config
    }

    /// Re-read the file if it changed since the last look.
    ///
    /// Returns `Ok(true)` when a new config was installed. On failure the old
    /// config stays and the new mtime is remembered, so a broken file is
    /// reported once rather than on every check.
    pub fn reload_if_changed(&mut self) -> Result<bool, ConfigError> {
        let modified = modified_at(&self.path);
        if modified == self.modified {
            return Ok(false);
        }
        self.modified = modified;
        let config = Config::load_from(&self.path)?;
        if config == self.config {
            return Ok(false);
        }
        self.config = config;
        Ok(true)
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
