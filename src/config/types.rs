use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub programs: Programs,
    #[serde(default)]
    pub startup: Startup,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Idle timers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Idle seconds before the screen blanks (default: 600).
    #[serde(default = "default_blank_timeout")]
    pub blank_timeout_secs: u64,
    /// Seconds after blanking before the lock is forced (default: 0).
    #[serde(default)]
    pub lock_timeout_secs: u64,
    /// Lock automatically once the lock timeout passes (default: false).
    #[serde(default)]
    pub lock_enabled: bool,
}

/// Input evidence tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Pointer travel, in pixels, that counts as activity (default: 10).
    #[serde(default = "default_pointer_hysteresis")]
    pub pointer_hysteresis: u32,
}

/// Child programs, looked up through `PATH` with `helper_dir` first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Programs {
    #[serde(default = "default_renderer")]
    pub renderer: String,
    #[serde(default = "default_authenticator")]
    pub authenticator: String,
    /// Optional session helper; `None` disables it.
    #[serde(default = "default_idle_helper")]
    pub idle_helper: Option<String>,
    /// Resets the server's own idle timer on deactivate.
    #[serde(default = "default_power_reset")]
    pub power_reset: Vec<String>,
    #[serde(default = "default_helper_dir")]
    pub helper_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Startup {
    /// Show the authenticator's splash at startup (default: true).
    #[serde(default = "default_splash")]
    pub splash: bool,
}

/// Verbosity forwarded to children as well as used for our own log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: u8,
    #[serde(default)]
    pub debug: bool,
}

fn default_blank_timeout() -> u64 {
    600
}

fn default_pointer_hysteresis() -> u32 {
    10
}

fn default_renderer() -> String {
    "xlockd-gfx".to_string()
}

fn default_authenticator() -> String {
    "xlockd-auth".to_string()
}

fn default_idle_helper() -> Option<String> {
    Some("xlockd-systemd".to_string())
}

fn default_power_reset() -> Vec<String> {
    vec!["xset".to_string(), "s".to_string(), "reset".to_string()]
}

fn default_helper_dir() -> String {
    "/usr/libexec/xlockd".to_string()
}

fn default_splash() -> bool {
    true
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            blank_timeout_secs: default_blank_timeout(),
            lock_timeout_secs: 0,
            lock_enabled: false,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pointer_hysteresis: default_pointer_hysteresis(),
        }
    }
}

impl Default for Programs {
    fn default() -> Self {
        Self {
            renderer: default_renderer(),
            authenticator: default_authenticator(),
            idle_helper: default_idle_helper(),
            power_reset: default_power_reset(),
            helper_dir: default_helper_dir(),
        }
    }
}

impl Default for Startup {
    fn default() -> Self {
        Self {
            splash: default_splash(),
        }
    }
}
