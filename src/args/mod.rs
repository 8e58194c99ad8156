//! Child process command lines.
//!
//! Every flag a supervised child can receive is assembled here, so the
//! combinations of verbosity, debug and role flags stay declarative:
//!
//! ```text
//! ChildArgs (verbosity, debug) + role flags → ArgAssembler → Vec<String>
//! ```

mod assembler;
mod env_builder;

pub use assembler::{ArgAssembler, RoleFlag};
pub use env_builder::EnvSet;

/// Which renderer content a forced activation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// Renderer's own choice.
    #[default]
    Random,
    Next,
    Prev,
    /// One-based index into the renderer's list.
    Select(u32),
    /// Like `Select`, but in demo mode.
    Demo(u32),
}

impl Selection {
    fn flag(self) -> Option<RoleFlag> {
        match self {
            Selection::Random => None,
            Selection::Next => Some(RoleFlag::Next),
            Selection::Prev => Some(RoleFlag::Prev),
            Selection::Select(n) => Some(RoleFlag::Select(n)),
            Selection::Demo(n) => Some(RoleFlag::Demo(n)),
        }
    }
}

/// How the renderer is being started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RendererLaunch {
    /// First renderer of this daemon's lifetime.
    pub init: bool,
    /// Skip the fade and blank immediately.
    pub emergency: bool,
    pub selection: Selection,
}

/// Flags shared by every child role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChildArgs {
    /// 0 to 4; more is clamped.
    pub verbose: u8,
    pub debug: bool,
}

impl ChildArgs {
    pub fn new(verbose: u8, debug: bool) -> Self {
        Self { verbose, debug }
    }

    fn base(&self) -> ArgAssembler {
        ArgAssembler::new()
            .with_verbosity(self.verbose)
            .with_debug(self.debug)
    }

    pub fn renderer(&self, launch: RendererLaunch) -> Vec<String> {
        let mut args = self.base();
        if launch.init {
            args = args.with_flag(RoleFlag::Init);
        }
        if launch.emergency {
            args = args.with_flag(RoleFlag::Emergency);
        }
        if let Some(flag) = launch.selection.flag() {
            args = args.with_flag(flag);
        }
        args.build()
    }

    pub fn authenticator(&self, splash: bool) -> Vec<String> {
        let args = self.base();
        if splash {
            args.with_flag(RoleFlag::Splash).build()
        } else {
            args.build()
        }
    }

    pub fn idle_helper(&self) -> Vec<String> {
        self.base().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_flags_follow_launch_kind() {
        let args = ChildArgs::new(2, true).renderer(RendererLaunch {
            init: true,
            emergency: true,
            selection: Selection::Select(3),
        });
        assert_eq!(
            args,
            vec!["-v", "-v", "--debug", "--init", "--emergency", "--select", "3"]
        );
    }

    #[test]
    fn quiet_renderer_has_no_flags() {
        let args = ChildArgs::default().renderer(RendererLaunch::default());
        assert!(args.is_empty());
    }

    #[test]
    fn authenticator_splash() {
        assert_eq!(ChildArgs::new(0, false).authenticator(true), vec!["--splash"]);
        assert!(ChildArgs::new(0, false).authenticator(false).is_empty());
    }

    #[test]
    fn verbosity_is_clamped() {
        assert_eq!(ChildArgs::new(9, false).idle_helper().len(), 4);
    }
}
