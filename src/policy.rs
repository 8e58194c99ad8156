//! Effective daemon policy: file config, command-line overrides, and the
//! one-time verdict on whether locking can mean anything here.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::args::ChildArgs;
use crate::config::{Config, Programs};

/// Why lock requests are refused for the life of this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockingDisabled {
    /// Built with the `no-locking` feature.
    CompiledOut,
    /// Running as root: the authenticator would check root's password.
    Privileged,
    /// The display lives on another host.
    RemoteDisplay(String),
    /// The server is a window inside another session.
    NestedServer(String),
    /// The session is not an X11 session; grabs do not cover the desktop.
    NonX11Session(String),
}

impl fmt::Display for LockingDisabled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockingDisabled::CompiledOut => write!(f, "not compiled with locking support"),
            LockingDisabled::Privileged => write!(f, "running as root"),
            LockingDisabled::RemoteDisplay(name) => write!(f, "display {} is remote", name),
            LockingDisabled::NestedServer(vendor) => write!(f, "nested X server ({})", vendor),
            LockingDisabled::NonX11Session(kind) => write!(f, "{} session", kind),
        }
    }
}

/// Facts about the runtime environment that decide [`LockingDisabled`].
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub euid: u32,
    pub display_name: String,
    pub vendor: String,
    pub session_type: Option<String>,
    pub wayland_display: Option<String>,
}

impl Environment {
    /// Snapshot of this process's environment for `display_name`.
    pub fn current(display_name: &str, vendor: &str) -> Self {
        Self {
            euid: unsafe { libc::geteuid() },
            display_name: display_name.to_string(),
            vendor: vendor.to_string(),
            session_type: std::env::var("XDG_SESSION_TYPE").ok(),
            wayland_display: std::env::var("WAYLAND_DISPLAY").ok(),
        }
    }
}

const NESTED_VENDORS: [&str; 2] = ["Xephyr", "Xnest"];

/// Decide once, at startup, whether this environment can be locked.
pub fn detect_locking_disabled(env: &Environment) -> Option<LockingDisabled> {
    if cfg!(feature = "no-locking") {
        return Some(LockingDisabled::CompiledOut);
    }
    if env.euid == 0 {
        return Some(LockingDisabled::Privileged);
    }
    if is_remote_display(&env.display_name) {
        return Some(LockingDisabled::RemoteDisplay(env.display_name.clone()));
    }
    if NESTED_VENDORS.iter().any(|v| env.vendor.contains(v)) {
        return Some(LockingDisabled::NestedServer(env.vendor.clone()));
    }
    if env.wayland_display.as_deref().is_some_and(|d| !d.is_empty()) {
        return Some(LockingDisabled::NonX11Session("wayland".to_string()));
    }
    match env.session_type.as_deref() {
        Some(kind) if !kind.is_empty() && kind != "x11" && kind != "tty" => {
            Some(LockingDisabled::NonX11Session(kind.to_string()))
        }
        _ => None,
    }
}

/// `host:display.screen` with a host other than this machine.
fn is_remote_display(name: &str) -> bool {
    let Some((host, _)) = name.rsplit_once(':') else {
        return false;
    };
    // "unix:0", "localhost:0", "/tmp/launch-x/org.x:0" and ":0" are local.
    !(host.is_empty()
        || host == "unix"
        || host == "localhost"
        || host == "127.0.0.1"
        || host.starts_with('/'))
}

/// Command-line overrides; `None` keeps the file's value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub verbose: Option<u8>,
    pub debug: bool,
    pub no_splash: bool,
}

/// Everything the state machine and supervisor read from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub blank_timeout: Duration,
    pub lock_timeout: Duration,
    pub lock_enabled: bool,
    pub locking_disabled: Option<LockingDisabled>,
    pub pointer_hysteresis: u32,
    pub splash: bool,
    pub child_args: ChildArgs,
    pub programs: Programs,
}

impl Policy {
    pub fn new(
        config: &Config,
        overrides: &Overrides,
        locking_disabled: Option<LockingDisabled>,
    ) -> Self {
        let verbose = overrides.verbose.unwrap_or(config.logging.verbose);
        let debug = overrides.debug || config.logging.debug;
        Self {
            blank_timeout: Duration::from_secs(config.timeouts.blank_timeout_secs),
            lock_timeout: Duration::from_secs(config.timeouts.lock_timeout_secs),
            lock_enabled: config.timeouts.lock_enabled,
            locking_disabled,
            pointer_hysteresis: config.input.pointer_hysteresis,
            splash: config.startup.splash && !overrides.no_splash,
            child_args: ChildArgs::new(verbose, debug),
            programs: config.programs.clone(),
        }
    }

    /// Same overrides and environment verdict, new file contents.
    pub fn reloaded(&self, config: &Config, overrides: &Overrides) -> Self {
        Self::new(config, overrides, self.locking_disabled.clone())
    }

    pub fn helper_dir(&self) -> PathBuf {
        PathBuf::from(&self.programs.helper_dir)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(&Config::default(), &Overrides::default(), None)
    }
}
