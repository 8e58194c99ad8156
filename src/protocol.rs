//! Control protocol vocabulary shared by the daemon and `xlockd-command`.
//!
//! A request is a `SCREENSAVER` ClientMessage whose first long is a command
//! atom and whose second is the numeric argument (`select N`, `demo N`). The
//! answer is a string property: `+message` on success, `-message` otherwise.

use x_session::Atoms;

use crate::lock::{Command, Reply};
use crate::status::ModeAtoms;

/// Version string published on the daemon window.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decode a ClientMessage payload. `None` for an unknown command atom.
pub fn decode_command(atoms: &Atoms, kind: u32, arg: i32) -> Option<Command> {
    let number = arg.max(0) as u32;
    let command = match kind {
        k if k == atoms.activate => Command::Activate,
        k if k == atoms.deactivate => Command::Deactivate,
        k if k == atoms.cycle => Command::Cycle,
        k if k == atoms.next => Command::Next,
        k if k == atoms.prev => Command::Prev,
        k if k == atoms.select => Command::Select(number),
        k if k == atoms.lock => Command::Lock,
        k if k == atoms.suspend => Command::Suspend,
        k if k == atoms.exit => Command::Exit,
        k if k == atoms.restart => Command::Restart,
        k if k == atoms.demo => Command::Demo(number),
        _ => return None,
    };
    Some(command)
}

/// `(kind, arg)` for sending `command`.
pub fn encode_command(atoms: &Atoms, command: Command) -> (u32, i32) {
    match command {
        Command::Activate => (atoms.activate, 0),
        Command::Deactivate => (atoms.deactivate, 0),
        Command::Cycle => (atoms.cycle, 0),
        Command::Next => (atoms.next, 0),
        Command::Prev => (atoms.prev, 0),
        Command::Select(n) => (atoms.select, n as i32),
        Command::Lock => (atoms.lock, 0),
        Command::Suspend => (atoms.suspend, 0),
        Command::Exit => (atoms.exit, 0),
        Command::Restart => (atoms.restart, 0),
        Command::Demo(n) => (atoms.demo, n as i32),
    }
}

/// Parse a command name as typed on the command line.
pub fn parse_command(name: &str, number: Option<u32>) -> Option<Command> {
    let command = match name {
        "activate" => Command::Activate,
        "deactivate" => Command::Deactivate,
        "cycle" => Command::Cycle,
        "next" => Command::Next,
        "prev" => Command::Prev,
        "select" => Command::Select(number?),
        "lock" => Command::Lock,
        "suspend" => Command::Suspend,
        "exit" => Command::Exit,
        "restart" => Command::Restart,
        "demo" => Command::Demo(number.unwrap_or(0)),
        _ => return None,
    };
    Some(command)
}

pub fn encode_reply(reply: &Reply) -> String {
    let tag = if reply.ok { '+' } else { '-' };
    format!("{}{}", tag, reply.message)
}

/// Anything not starting with `+` is a failure.
pub fn decode_reply(text: &str) -> Reply {
    match text.strip_prefix('+') {
        Some(message) => Reply::success(message),
        None => Reply::failure(text.strip_prefix('-').unwrap_or(text)),
    }
}

pub fn mode_atoms(atoms: &Atoms) -> ModeAtoms {
    ModeAtoms {
        blank: atoms.blank,
        lock: atoms.lock,
    }
}
