//! Daemon configuration: TOML file, validation, change detection.

mod loader;
mod store;
mod types;

pub use loader::ConfigError;
pub use store::ConfigStore;
pub use types::{Config, InputConfig, LoggingConfig, Programs, Startup, Timeouts};
