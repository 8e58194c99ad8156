use std::fmt;

use super::launcher::Pid;

/// What a supervised child is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Paints the blanked screen.
    Renderer,
    /// Prompts for and checks credentials; exit code is the verdict.
    Authenticator,
    /// Optional desktop-session/idle-policy helper.
    IdleHelper,
    /// Fire-and-forget one-shot commands; no slot, never respawned.
    Utility,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Renderer => "renderer",
            Role::Authenticator => "authenticator",
            Role::IdleHelper => "idle-helper",
            Role::Utility => "utility",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// At most one live process per role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildSlot {
    pub pid: Option<Pid>,
    pub stopped: bool,
}

impl ChildSlot {
    pub fn occupy(&mut self, pid: Pid) {
        self.pid = Some(pid);
        self.stopped = false;
    }

    pub fn clear(&mut self) {
        self.pid = None;
        self.stopped = false;
    }

    pub fn holds(&self, pid: Pid) -> bool {
        self.pid == Some(pid)
    }
}
