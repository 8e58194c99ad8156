//! Shared fakes for the display and the process launcher.

#![allow(dead_code, unused_imports)]

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use xlockd::grab::{CursorShape, GrabManager, GrabOutcome, GrabPort};
use xlockd::lock::{LockStateMachine, Moment};
use xlockd::policy::{LockingDisabled, Policy};
use xlockd::status::{ModeAtoms, StatusPort};
use xlockd::supervisor::{ChildExit, LaunchError, Launcher, Pid};

pub const ATOMS: ModeAtoms = ModeAtoms {
    blank: 501,
    lock: 502,
};

/// Display with scripted grab outcomes and an in-memory status property.
#[derive(Default)]
pub struct FakeDisplay {
    pub keyboard: VecDeque<GrabOutcome>,
    pub pointer: VecDeque<GrabOutcome>,
    /// Outcome once the scripts run out.
    pub refuse_keyboard: bool,
    pub keyboard_grabbed: bool,
    pub pointer_grabbed: bool,
    pub cursor: Option<CursorShape>,
    pub focus_cleared: usize,
    pub property: Vec<u32>,
    pub writes: usize,
}

impl GrabPort for FakeDisplay {
    fn grab_keyboard(&mut self) -> GrabOutcome {
        let outcome = self.keyboard.pop_front().unwrap_or(if self.refuse_keyboard {
            GrabOutcome::AlreadyGrabbed
        } else {
            GrabOutcome::Success
        });
        if outcome.is_success() {
            self.keyboard_grabbed = true;
        }
        outcome
    }

    fn grab_pointer(&mut self, cursor: CursorShape) -> GrabOutcome {
        let outcome = self.pointer.pop_front().unwrap_or(GrabOutcome::Success);
        if outcome.is_success() {
            self.pointer_grabbed = true;
            self.cursor = Some(cursor);
        }
        outcome
    }

    fn ungrab_keyboard(&mut self) {
        self.keyboard_grabbed = false;
    }

    fn ungrab_pointer(&mut self) {
        self.pointer_grabbed = false;
        self.cursor = None;
    }

    fn clear_focus(&mut self) {
        self.focus_cleared += 1;
    }
}

impl StatusPort for FakeDisplay {
    fn read_status(&mut self) -> Vec<u32> {
        self.property.clone()
    }

    fn write_status(&mut self, values: &[u32]) {
        self.property = values.to_vec();
        self.writes += 1;
    }
}

/// One recorded launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub pid: Pid,
    pub program: String,
    pub args: Vec<String>,
}

/// Launcher that hands out PIDs from 1000 and reaps whatever the test
/// queues.
#[derive(Default)]
pub struct FakeLauncher {
    pub launches: Vec<Launch>,
    pub signals: Vec<(Pid, i32)>,
    pub exits: VecDeque<(Pid, ChildExit)>,
    pub fail_programs: Vec<String>,
}

impl FakeLauncher {
    pub fn launched(&self, program: &str) -> Vec<&Launch> {
        self.launches
            .iter()
            .filter(|launch| launch.program == program)
            .collect()
    }

    pub fn last_pid(&self, program: &str) -> Pid {
        self.launched(program)
            .last()
            .map(|launch| launch.pid)
            .expect("program was never launched")
    }
}

impl Launcher for FakeLauncher {
    fn launch(&mut self, program: &str, args: &[String]) -> Result<Pid, LaunchError> {
        if self.fail_programs.iter().any(|p| p == program) {
            return Err(LaunchError::Spawn {
                program: program.to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        let pid = 1000 + self.launches.len() as Pid;
        self.launches.push(Launch {
            pid,
            program: program.to_string(),
            args: args.to_vec(),
        });
        Ok(pid)
    }

    fn signal(&mut self, pid: Pid, signal: i32) -> io::Result<()> {
        self.signals.push((pid, signal));
        Ok(())
    }

    fn reap(&mut self) -> Option<(Pid, ChildExit)> {
        self.exits.pop_front()
    }
}

pub type Machine = LockStateMachine<FakeLauncher>;

pub const RENDERER: &str = "xlockd-gfx";
pub const AUTHENTICATOR: &str = "xlockd-auth";

/// Policy with a 60 s blank timeout, no splash and no idle helper.
pub fn policy() -> Policy {
    let mut policy = Policy::default();
    policy.blank_timeout = Duration::from_secs(60);
    policy.splash = false;
    policy.programs.idle_helper = None;
    policy
}

pub fn auto_lock(lock_after: Duration) -> Policy {
    let mut policy = policy();
    policy.lock_enabled = true;
    policy.lock_timeout = lock_after;
    policy
}

pub fn locking_disabled() -> Policy {
    let mut policy = policy();
    policy.locking_disabled = Some(LockingDisabled::Privileged);
    policy
}

pub fn machine_with(policy: Policy, start: Moment) -> Machine {
    LockStateMachine::new(
        policy,
        FakeLauncher::default(),
        ATOMS,
        GrabManager::with_retry(4, Duration::ZERO),
        start,
    )
}

pub fn started(policy: Policy) -> (Machine, FakeDisplay, Moment) {
    let start = Moment::now();
    let mut machine = machine_with(policy, start);
    let mut display = FakeDisplay::default();
    machine.start(&mut display, start);
    (machine, display, start)
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// Queue an exit for `pid` and run the reaper.
pub fn exit_child(machine: &mut Machine, display: &mut FakeDisplay, pid: Pid, exit: ChildExit, now: Moment) {
    machine
        .children_mut()
        .launcher_mut()
        .exits
        .push_back((pid, exit));
    machine.reap_children(display, now);
}
