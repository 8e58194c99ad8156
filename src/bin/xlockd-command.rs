//! xlockd-command - send a command to a running xlockd.
//!
//! ```bash
//! xlockd-command lock
//! xlockd-command select 3
//! xlockd-command --time
//! ```

use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::Parser;

use xlockd::client::{describe_status, Client, RESPONSE_TIMEOUT};
use xlockd::protocol::parse_command;

/// Control a running xlockd.
#[derive(Parser)]
#[command(name = "xlockd-command")]
#[command(version, about, long_about = None)]
struct Cli {
    /// X display the daemon manages [default: $DISPLAY]
    #[arg(long, value_name = "DISPLAY")]
    display: Option<String>,

    /// Print when the screen was last blanked or locked
    #[arg(long, conflicts_with = "command")]
    time: bool,

    /// activate, deactivate, cycle, next, prev, select N, lock, suspend,
    /// exit, restart, demo N
    #[arg(required_unless_present = "time")]
    command: Option<String>,

    /// Argument for select and demo
    number: Option<u32>,
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("xlockd-command: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();
    let client = Client::connect(cli.display.as_deref()).context("Failed to open display")?;

    if cli.time {
        let status = client.status()?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        println!("{}", describe_status(&status, now));
        return Ok(true);
    }

    let name = cli.command.unwrap_or_default();
    let Some(command) = parse_command(&name, cli.number) else {
        bail!("unknown command or missing number: '{}'", name);
    };
    let reply = client.send(command, RESPONSE_TIMEOUT)?;
    if reply.ok {
        println!("{}", reply.message);
    } else {
        eprintln!("{}", reply.message);
    }
    Ok(reply.ok)
}
