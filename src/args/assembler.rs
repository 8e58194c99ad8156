//! Argument assembly for every child role.

/// Most `-v` flags a child accepts.
pub const MAX_VERBOSITY: u8 = 4;

/// Role-specific flags understood by the child programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFlag {
    Emergency,
    Init,
    Splash,
    Next,
    Prev,
    Select(u32),
    Demo(u32),
}

impl RoleFlag {
    fn push_onto(self, args: &mut Vec<String>) {
        match self {
            RoleFlag::Emergency => args.push("--emergency".into()),
            RoleFlag::Init => args.push("--init".into()),
            RoleFlag::Splash => args.push("--splash".into()),
            RoleFlag::Next => args.push("--next".into()),
            RoleFlag::Prev => args.push("--prev".into()),
            RoleFlag::Select(n) => {
                args.push("--select".into());
                args.push(n.to_string());
            }
            RoleFlag::Demo(n) => {
                args.push("--demo".into());
                args.push(n.to_string());
            }
        }
    }
}

/// Builder for the argument vector of one child launch.
#[derive(Debug, Clone, Default)]
pub struct ArgAssembler {
    args: Vec<String>,
}

impl ArgAssembler {
    /// Start with an empty arg list.
    pub fn new() -> Self {
        Self { args: Vec::new() }
    }

    /// One `-v` per level, at most [`MAX_VERBOSITY`].
    pub fn with_verbosity(mut self, level: u8) -> Self {
        for _ in 0..level.min(MAX_VERBOSITY) {
            self.args.push("-v".into());
        }
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug {
            self.args.push("--debug".into());
        }
        self
    }

    pub fn with_flag(mut self, flag: RoleFlag) -> Self {
        flag.push_onto(&mut self.args);
        self
    }

    /// Build the final argument list.
    pub fn build(self) -> Vec<String> {
        self.args
    }
}
