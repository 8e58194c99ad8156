//! Child process supervision.
//!
//! Tracks one slot per role, reaps without blocking, and decides whether a
//! dead renderer comes back. Spawn failures never propagate: they are logged
//! and surface later as an ordinary reap with exit code -1, exactly like a
//! child whose exec failed.

mod exit;
mod launcher;
mod respawn;
mod role;

use std::collections::VecDeque;

use tracing::{debug, error, info, warn};

pub use exit::{ChildExit, AUTH_SUCCESS_CODE};
pub use launcher::{LaunchError, Launcher, Pid, ProcessLauncher};
pub use respawn::{RespawnGuard, RESPAWN_CEILING};
pub use role::{ChildSlot, Role};

/// Roles that own a slot.
const SLOTTED: [Role; 3] = [Role::Renderer, Role::Authenticator, Role::IdleHelper];

/// One child that changed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaped {
    /// `None` for a process we never launched (or no longer remember).
    pub role: Option<Role>,
    /// 0 for a launch that failed before a process existed.
    pub pid: Pid,
    pub exit: ChildExit,
    /// We had asked it to terminate.
    pub expected: bool,
}

/// Verdict on a dead renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnDecision {
    /// Not a crash that needs covering (expected exit, or not blanked).
    NotNeeded,
    /// Relaunch now, in emergency mode.
    Respawn,
    /// Crash loop: keep the grab, paint nothing.
    Suppressed,
}

pub struct ChildSupervisor<L: Launcher> {
    launcher: L,
    renderer: ChildSlot,
    authenticator: ChildSlot,
    idle_helper: ChildSlot,
    detached: Vec<Pid>,
    killed: Vec<(Pid, Role)>,
    pending: VecDeque<Reaped>,
    guard: RespawnGuard,
}

impl<L: Launcher> ChildSupervisor<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            renderer: ChildSlot::default(),
            authenticator: ChildSlot::default(),
            idle_helper: ChildSlot::default(),
            detached: Vec::new(),
            killed: Vec::new(),
            pending: VecDeque::new(),
            guard: RespawnGuard::default(),
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn launcher_mut(&mut self) -> &mut L {
        &mut self.launcher
    }

    fn slot(&self, role: Role) -> Option<&ChildSlot> {
        match role {
            Role::Renderer => Some(&self.renderer),
            Role::Authenticator => Some(&self.authenticator),
            Role::IdleHelper => Some(&self.idle_helper),
            Role::Utility => None,
        }
    }

    fn slot_mut(&mut self, role: Role) -> Option<&mut ChildSlot> {
        match role {
            Role::Renderer => Some(&mut self.renderer),
            Role::Authenticator => Some(&mut self.authenticator),
            Role::IdleHelper => Some(&mut self.idle_helper),
            Role::Utility => None,
        }
    }

    pub fn pid(&self, role: Role) -> Option<Pid> {
        self.slot(role).and_then(|slot| slot.pid)
    }

    pub fn is_running(&self, role: Role) -> bool {
        self.pid(role).is_some()
    }

    pub fn is_stopped(&self, role: Role) -> bool {
        self.slot(role).map(|slot| slot.stopped).unwrap_or(false)
    }

    /// True when a failed launch is waiting to be reported by [`reap_all`](Self::reap_all).
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Launch `program` for `role`, replacing any live process in that slot.
    pub fn spawn(&mut self, role: Role, program: &str, args: &[String]) -> Option<Pid> {
        if self.is_running(role) {
            warn!(role = %role, "Replacing a running child");
            self.kill(role);
        }

        match self.launcher.launch(program, args) {
            Ok(pid) => {
                info!(role = %role, pid, program, args = ?args, "Launched child");
                match self.slot_mut(role) {
                    Some(slot) => slot.occupy(pid),
                    None => self.detached.push(pid),
                }
                Some(pid)
            }
            Err(err) => {
                error!(role = %role, error = %err, "Child failed to start");
                self.pending.push_back(Reaped {
                    role: Some(role),
                    pid: 0,
                    exit: ChildExit::Exited(-1),
                    expected: false,
                });
                None
            }
        }
    }

    /// Terminate the child in `role`, continuing it first if it was stopped
    /// so the terminate is actually delivered. Returns false if the slot was
    /// empty.
    pub fn kill(&mut self, role: Role) -> bool {
        let (pid, stopped) = match self.slot_mut(role) {
            Some(slot) => match slot.pid {
                Some(pid) => {
                    let stopped = slot.stopped;
                    slot.clear();
                    (pid, stopped)
                }
                None => return false,
            },
            None => return false,
        };

        if stopped {
            if let Err(err) = self.launcher.signal(pid, libc::SIGCONT) {
                debug!(role = %role, pid, error = %err, "SIGCONT failed");
            }
        }
        match self.launcher.signal(pid, libc::SIGTERM) {
            Ok(()) => debug!(role = %role, pid, "Sent SIGTERM"),
            Err(err) if err.raw_os_error() == Some(libc::ESRCH) => {
                debug!(role = %role, pid, "Child was already dead")
            }
            Err(err) => warn!(role = %role, pid, error = %err, "Couldn't kill child"),
        }
        self.killed.push((pid, role));
        true
    }

    /// Terminate every child, including detached utilities.
    pub fn kill_all(&mut self) {
        for role in SLOTTED {
            self.kill(role);
        }
        for pid in std::mem::take(&mut self.detached) {
            match self.launcher.signal(pid, libc::SIGTERM) {
                Ok(()) => debug!(role = %Role::Utility, pid, "Sent SIGTERM"),
                Err(err) => debug!(role = %Role::Utility, pid, error = %err, "Utility already gone"),
            }
            self.killed.push((pid, Role::Utility));
        }
    }

    /// Collect every child that changed state since the last call, without
    /// blocking.
    pub fn reap_all(&mut self) -> Vec<Reaped> {
        let mut reaped: Vec<Reaped> = self.pending.drain(..).collect();
        while let Some((pid, exit)) = self.launcher.reap() {
            reaped.push(self.account(pid, exit));
        }
        reaped
    }

    fn account(&mut self, pid: Pid, exit: ChildExit) -> Reaped {
        if let Some(index) = self.killed.iter().position(|(killed, _)| *killed == pid) {
            let role = self.killed[index].1;
            if exit.is_terminal() {
                self.killed.remove(index);
            }
            debug!(role = %role, pid, %exit, "Child finished after kill");
            return Reaped {
                role: Some(role),
                pid,
                exit,
                expected: true,
            };
        }

        if let Some(index) = self.detached.iter().position(|detached| *detached == pid) {
            if exit.is_terminal() {
                self.detached.remove(index);
            }
            log_exit(Role::Utility, pid, exit);
            return Reaped {
                role: Some(Role::Utility),
                pid,
                exit,
                expected: false,
            };
        }

        for role in SLOTTED {
            let Some(slot) = self.slot_mut(role) else {
                continue;
            };
            if !slot.holds(pid) {
                continue;
            }
            if exit.is_terminal() {
                slot.clear();
            } else {
                slot.stopped = true;
            }
            log_exit(role, pid, exit);
            return Reaped {
                role: Some(role),
                pid,
                exit,
                expected: false,
            };
        }

        warn!(pid, %exit, "Reaped an unknown child");
        Reaped {
            role: None,
            pid,
            exit,
            expected: false,
        }
    }

    /// Decide whether a reaped renderer comes back. Only unexpected deaths
    /// while the screen should be blanked count against the respawn guard.
    pub fn renderer_respawn(&mut self, reaped: &Reaped, expects_blank: bool) -> RespawnDecision {
        if reaped.role != Some(Role::Renderer)
            || reaped.expected
            || !reaped.exit.is_terminal()
            || !expects_blank
        {
            return RespawnDecision::NotNeeded;
        }
        if self.guard.admit() {
            warn!(
                attempt = self.guard.attempts(),
                ceiling = RESPAWN_CEILING,
                "Renderer died while blanked; relaunching"
            );
            RespawnDecision::Respawn
        } else {
            error!(
                attempts = self.guard.attempts(),
                "Renderer keeps dying; leaving the screen grabbed and unpainted"
            );
            RespawnDecision::Suppressed
        }
    }

    pub fn reset_respawn_guard(&mut self) {
        self.guard.reset();
    }

    pub fn respawn_guard(&self) -> &RespawnGuard {
        &self.guard
    }
}

fn log_exit(role: Role, pid: Pid, exit: ChildExit) {
    match exit {
        ChildExit::Exited(0) => info!(role = %role, pid, "Child exited normally"),
        ChildExit::Exited(_) => warn!(role = %role, pid, %exit, "Child exited abnormally"),
        ChildExit::Signaled(_) => warn!(role = %role, pid, %exit, "Child terminated"),
        ChildExit::Stopped(_) => info!(role = %role, pid, %exit, "Child stopped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    #[derive(Default)]
    struct ScriptedLauncher {
        next_pid: Pid,
        fail: bool,
        signals: Vec<(Pid, i32)>,
        exits: VecDeque<(Pid, ChildExit)>,
    }

    impl Launcher for ScriptedLauncher {
        fn launch(&mut self, program: &str, _args: &[String]) -> Result<Pid, LaunchError> {
            if self.fail {
                return Err(LaunchError::Spawn {
                    program: program.to_string(),
                    source: io::Error::from(io::ErrorKind::NotFound),
                });
            }
            self.next_pid += 1;
            Ok(100 + self.next_pid)
        }

        fn signal(&mut self, pid: Pid, signal: i32) -> io::Result<()> {
            self.signals.push((pid, signal));
            Ok(())
        }

        fn reap(&mut self) -> Option<(Pid, ChildExit)> {
            self.exits.pop_front()
        }
    }

    fn supervisor() -> ChildSupervisor<ScriptedLauncher> {
        ChildSupervisor::new(ScriptedLauncher::default())
    }

    #[test]
    fn spawn_replaces_the_slot_occupant() {
        let mut sup = supervisor();
        let first = sup.spawn(Role::Renderer, "gfx", &[]).unwrap();
        let second = sup.spawn(Role::Renderer, "gfx", &[]).unwrap();

        assert_ne!(first, second);
        assert_eq!(sup.pid(Role::Renderer), Some(second));
        assert_eq!(sup.launcher().signals, vec![(first, libc::SIGTERM)]);
    }

    #[test]
    fn failed_launch_reports_as_reap() {
        let mut sup = supervisor();
        sup.launcher_mut().fail = true;

        assert_eq!(sup.spawn(Role::Authenticator, "auth", &[]), None);
        assert!(sup.has_pending());

        let reaped = sup.reap_all();
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].role, Some(Role::Authenticator));
        assert_eq!(reaped[0].exit, ChildExit::Exited(-1));
        assert!(!sup.has_pending());
    }

    #[test]
    fn killed_child_reaps_as_expected() {
        let mut sup = supervisor();
        let pid = sup.spawn(Role::Renderer, "gfx", &[]).unwrap();
        assert!(sup.kill(Role::Renderer));
        assert!(!sup.kill(Role::Renderer));

        sup.launcher_mut()
            .exits
            .push_back((pid, ChildExit::Signaled(libc::SIGTERM)));
        let reaped = sup.reap_all();
        assert!(reaped[0].expected);
        assert_eq!(reaped[0].role, Some(Role::Renderer));
    }

    #[test]
    fn stopped_child_is_continued_before_kill() {
        let mut sup = supervisor();
        let pid = sup.spawn(Role::Renderer, "gfx", &[]).unwrap();
        sup.launcher_mut()
            .exits
            .push_back((pid, ChildExit::Stopped(libc::SIGSTOP)));
        sup.reap_all();
        assert!(sup.is_stopped(Role::Renderer));
        assert!(sup.is_running(Role::Renderer));

        sup.kill(Role::Renderer);
        assert_eq!(
            sup.launcher().signals,
            vec![(pid, libc::SIGCONT), (pid, libc::SIGTERM)]
        );
    }

    #[test]
    fn utility_children_have_no_slot() {
        let mut sup = supervisor();
        let pid = sup.spawn(Role::Utility, "xset", &[]).unwrap();
        assert_eq!(sup.pid(Role::Utility), None);

        sup.launcher_mut().exits.push_back((pid, ChildExit::Exited(0)));
        let reaped = sup.reap_all();
        assert_eq!(reaped[0].role, Some(Role::Utility));
    }

    #[test]
    fn kill_all_reaches_detached_utilities() {
        let mut sup = supervisor();
        let renderer = sup.spawn(Role::Renderer, "gfx", &[]).unwrap();
        let xset = sup.spawn(Role::Utility, "xset", &[]).unwrap();

        sup.kill_all();
        assert_eq!(
            sup.launcher().signals,
            vec![(renderer, libc::SIGTERM), (xset, libc::SIGTERM)]
        );

        sup.launcher_mut()
            .exits
            .push_back((xset, ChildExit::Signaled(libc::SIGTERM)));
        let reaped = sup.reap_all();
        assert!(reaped[0].expected);
        assert_eq!(reaped[0].role, Some(Role::Utility));
    }

    #[test]
    fn respawn_only_covers_unexpected_renderer_deaths_while_blanked() {
        let mut sup = supervisor();
        let crash = Reaped {
            role: Some(Role::Renderer),
            pid: 7,
            exit: ChildExit::Signaled(libc::SIGSEGV),
            expected: false,
        };

        assert_eq!(sup.renderer_respawn(&crash, false), RespawnDecision::NotNeeded);
        let killed = Reaped {
            expected: true,
            ..crash.clone()
        };
        assert_eq!(sup.renderer_respawn(&killed, true), RespawnDecision::NotNeeded);

        for _ in 0..RESPAWN_CEILING {
            assert_eq!(sup.renderer_respawn(&crash, true), RespawnDecision::Respawn);
        }
        assert_eq!(sup.renderer_respawn(&crash, true), RespawnDecision::Suppressed);

        sup.reset_respawn_guard();
        assert_eq!(sup.respawn_guard().attempts(), 0);
    }
}
