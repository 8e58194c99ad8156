//! xlockd - screen-lock daemon.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::info;

use xlockd::config::{Config, ConfigStore};
use xlockd::daemon::{reexec, Daemon, DaemonOptions};
use xlockd::lock::Control;
use xlockd::logging::init_tracing;
use xlockd::policy::Overrides;
use xlockd::protocol::VERSION;

/// Blank and lock an X11 display after a period of inactivity.
#[derive(Parser)]
#[command(name = "xlockd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// X display to manage [default: $DISPLAY]
    #[arg(long, value_name = "DISPLAY")]
    display: Option<String>,

    /// Path to config file [default: ~/.config/xlockd/config.toml]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase verbosity; repeated up to four times, forwarded to children
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Pass --debug to children
    #[arg(long)]
    debug: bool,

    /// Don't show the splash screen at startup
    #[arg(long)]
    no_splash: bool,

    /// Append log output to FILE instead of stderr
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.config.clone().unwrap_or_else(Config::config_path);
    let store = ConfigStore::open(path).context("Failed to load configuration")?;

    let overrides = Overrides {
        verbose: (cli.verbose > 0).then_some(cli.verbose),
        debug: cli.debug,
        no_splash: cli.no_splash,
    };
    let verbose = overrides.verbose.unwrap_or(store.get().logging.verbose);
    init_tracing(verbose, cli.log.as_deref()).context("Failed to open log file")?;

    info!(version = VERSION, config = %store.path().display(), "Starting xlockd");

    let daemon = Daemon::start(DaemonOptions {
        display: cli.display,
        store,
        overrides,
    })
    .context("Startup failed")?;

    match daemon.run().context("Lost the X connection")? {
        Control::Restart => Err(reexec()).context("Failed to restart"),
        Control::Exit | Control::Continue => {
            info!("Exiting");
            Ok(())
        }
    }
}
