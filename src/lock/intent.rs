use std::fmt;

use crate::args::Selection;

/// External requests, as delivered over the control protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Activate,
    Deactivate,
    /// Blank, or switch the renderer to new content if already blanked.
    Cycle,
    Next,
    Prev,
    Select(u32),
    Lock,
    /// Blank at once, with no fade.
    Suspend,
    Exit,
    Restart,
    Demo(u32),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Activate => "activate",
            Command::Deactivate => "deactivate",
            Command::Cycle => "cycle",
            Command::Next => "next",
            Command::Prev => "prev",
            Command::Select(_) => "select",
            Command::Lock => "lock",
            Command::Suspend => "suspend",
            Command::Exit => "exit",
            Command::Restart => "restart",
            Command::Demo(_) => "demo",
        }
    }

    /// Renderer content asked for, for commands that blank.
    pub(crate) fn selection(&self) -> Option<Selection> {
        match self {
            Command::Activate | Command::Suspend | Command::Cycle => Some(Selection::Random),
            Command::Next => Some(Selection::Next),
            Command::Prev => Some(Selection::Prev),
            Command::Select(n) => Some(Selection::Select(*n)),
            Command::Demo(n) => Some(Selection::Demo(*n)),
            Command::Deactivate | Command::Lock | Command::Exit | Command::Restart => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Select(n) | Command::Demo(n) => write!(f, "{} {}", self.name(), n),
            _ => f.write_str(self.name()),
        }
    }
}

/// Exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub ok: bool,
    pub message: String,
}

impl Reply {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// What the event loop does after a request or signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
    Restart,
}
