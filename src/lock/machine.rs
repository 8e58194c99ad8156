use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::args::{RendererLaunch, Selection};
use crate::grab::{CursorShape, GrabManager, GrabPort};
use crate::idle::{Activity, IdleEvidence};
use crate::lock::intent::{Command, Control, Reply};
use crate::lock::state::{LockState, Moment, Timestamps};
use crate::policy::Policy;
use crate::signals::PendingSignals;
use crate::status::{ModeAtoms, StatusMode, StatusPort, StatusPublisher};
use crate::supervisor::{ChildSupervisor, Launcher, Reaped, RespawnDecision, Role};

/// Activity within this long of a forced transition or a dismissed prompt
/// does not count.
pub const DEBOUNCE: Duration = Duration::from_secs(1);

/// After a failed idle-triggered grab, the idle timeout waits this long.
pub const GRAB_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// How a blank was asked for.
#[derive(Debug, Clone, Copy)]
struct BlankRequest {
    forced: bool,
    lock: bool,
    emergency: bool,
    selection: Selection,
}

pub struct LockStateMachine<L: Launcher> {
    policy: Policy,
    state: LockState,
    times: Timestamps,
    idle: IdleEvidence,
    grabs: GrabManager,
    status: StatusPublisher,
    children: ChildSupervisor<L>,
    selection: Selection,
    renderer_launched: bool,
    grab_retry_at: Option<Instant>,
}

impl<L: Launcher> LockStateMachine<L> {
    pub fn new(
        policy: Policy,
        launcher: L,
        atoms: ModeAtoms,
        grabs: GrabManager,
        now: Moment,
    ) -> Self {
        let idle = IdleEvidence::new(now.at, policy.pointer_hysteresis);
        Self {
            policy,
            state: LockState::Unblanked,
            times: Timestamps::new(now),
            idle,
            grabs,
            status: StatusPublisher::new(atoms),
            children: ChildSupervisor::new(launcher),
            selection: Selection::Random,
            renderer_launched: false,
            grab_retry_at: None,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn timestamps(&self) -> &Timestamps {
        &self.times
    }

    pub fn idle(&self) -> &IdleEvidence {
        &self.idle
    }

    pub fn grabs(&self) -> &GrabManager {
        &self.grabs
    }

    pub fn status(&self) -> &StatusPublisher {
        &self.status
    }

    pub fn children(&self) -> &ChildSupervisor<L> {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut ChildSupervisor<L> {
        &mut self.children
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Install a reloaded policy. Takes effect at the next evaluation.
    pub fn set_policy(&mut self, policy: Policy) {
        self.idle.set_hysteresis(policy.pointer_hysteresis);
        self.policy = policy;
    }

    /// Publish the initial status and start the children that run from the
    /// beginning.
    pub fn start<D: GrabPort + StatusPort>(&mut self, display: &mut D, now: Moment) {
        self.times.since = now.unix;
        self.status.publish(display, StatusMode::Unblanked, now.unix);

        if let Some(helper) = self.policy.programs.idle_helper.clone() {
            let args = self.policy.child_args.idle_helper();
            self.children.spawn(Role::IdleHelper, &helper, &args);
        }
        if self.policy.splash {
            let args = self.policy.child_args.authenticator(true);
            let program = self.policy.programs.authenticator.clone();
            self.children.spawn(Role::Authenticator, &program, &args);
        }
    }

    /// Feed one input event into the idle evidence. Transitions happen in
    /// [`evaluate`](Self::evaluate).
    pub fn record_activity(&mut self, activity: Activity, now: Instant) {
        if self.idle.record(activity, now) {
            debug!(activity = ?activity, "User activity");
        }
    }

    /// When the loop must wake next even if nothing arrives.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            LockState::Unblanked => {
                let blank_at = self.idle.active_at() + self.policy.blank_timeout;
                Some(match self.grab_retry_at {
                    Some(retry) if retry > blank_at => retry,
                    _ => blank_at,
                })
            }
            LockState::Blanked if self.auto_lock_armed() => self
                .times
                .blanked_at
                .map(|blanked| blanked + self.policy.lock_timeout),
            _ => None,
        }
    }

    fn auto_lock_armed(&self) -> bool {
        self.policy.lock_enabled && self.policy.locking_disabled.is_none()
    }

    /// Activity newer than the debounce window.
    fn has_fresh_activity(&self) -> bool {
        self.idle.active_at() >= self.times.ignore_activity_before
    }

    /// Apply timeouts and fresh activity until the state settles.
    pub fn evaluate<D: GrabPort + StatusPort>(&mut self, display: &mut D, now: Moment) {
        // Each pass can only move forward along Unblanked→Blanked→Locked.
        for _ in 0..3 {
            let before = self.state;
            self.evaluate_once(display, now);
            if self.state == before {
                break;
            }
        }
    }

    fn evaluate_once<D: GrabPort + StatusPort>(&mut self, display: &mut D, now: Moment) {
        match self.state {
            LockState::Unblanked => {
                if now.at < self.idle.active_at() + self.policy.blank_timeout {
                    return;
                }
                if self.grab_retry_at.is_some_and(|retry| now.at < retry) {
                    return;
                }
                info!("Idle timeout reached; blanking");
                self.blank(
                    display,
                    now,
                    BlankRequest {
                        forced: false,
                        lock: false,
                        emergency: false,
                        selection: Selection::Random,
                    },
                );
            }
            LockState::Blanked => {
                if self.has_fresh_activity() {
                    self.unblank(display, now);
                    return;
                }
                let lock_due = self
                    .times
                    .blanked_at
                    .is_some_and(|blanked| now.at >= blanked + self.policy.lock_timeout);
                if self.auto_lock_armed() && lock_due {
                    info!("Lock timeout reached; locking");
                    self.enter_locked(display, now);
                }
            }
            LockState::Locked => {
                if self.has_fresh_activity() {
                    self.authenticate(display);
                }
            }
            LockState::Authenticating => {}
        }
    }

    /// Handle one control request. Always produces exactly one reply.
    pub fn handle_command<D: GrabPort + StatusPort>(
        &mut self,
        display: &mut D,
        command: Command,
        now: Moment,
    ) -> (Reply, Control) {
        info!(command = %command, state = ?self.state, "Received command");
        let continue_with = |reply| (reply, Control::Continue);

        match command {
            Command::Deactivate => continue_with(self.deactivate(display, now)),
            Command::Lock => continue_with(self.request_lock(display, now)),
            Command::Exit | Command::Restart => {
                if self.state.is_locked() {
                    warn!(command = %command, "Refusing while locked");
                    return continue_with(Reply::failure(format!(
                        "{} refused: screen is locked",
                        command.name()
                    )));
                }
                self.shutdown(display, now);
                if command == Command::Exit {
                    (Reply::success("exiting"), Control::Exit)
                } else {
                    (Reply::success("restarting"), Control::Restart)
                }
            }
            Command::Activate
            | Command::Cycle
            | Command::Next
            | Command::Prev
            | Command::Select(_)
            | Command::Suspend
            | Command::Demo(_) => {
                let selection = command.selection().unwrap_or_default();
                continue_with(self.activate(display, command, selection, now))
            }
        }
    }

    fn activate<D: GrabPort + StatusPort>(
        &mut self,
        display: &mut D,
        command: Command,
        selection: Selection,
        now: Moment,
    ) -> Reply {
        let emergency = command == Command::Suspend;
        if self.state == LockState::Unblanked {
            let blanked = self.blank(
                display,
                now,
                BlankRequest {
                    forced: true,
                    lock: false,
                    emergency,
                    selection,
                },
            );
            return if blanked {
                Reply::success("activating")
            } else {
                Reply::failure("unable to grab keyboard")
            };
        }

        self.debounce(now);
        if command == Command::Activate || command == Command::Suspend {
            return Reply::success("already active");
        }
        // A manual change of content, not a crash.
        self.children.reset_respawn_guard();
        self.selection = selection;
        self.launch_renderer(false);
        Reply::success(command.name())
    }

    fn request_lock<D: GrabPort + StatusPort>(&mut self, display: &mut D, now: Moment) -> Reply {
        if let Some(reason) = &self.policy.locking_disabled {
            warn!(reason = %reason, "Lock requested but locking is disabled");
            return Reply::failure(format!("locking disabled ({})", reason));
        }
        match self.state {
            LockState::Unblanked => {
                let locked = self.blank(
                    display,
                    now,
                    BlankRequest {
                        forced: true,
                        lock: true,
                        emergency: false,
                        selection: Selection::Random,
                    },
                );
                if locked {
                    Reply::success("locking")
                } else {
                    Reply::failure("unable to grab keyboard")
                }
            }
            LockState::Blanked => {
                self.debounce(now);
                self.enter_locked(display, now);
                Reply::success("locking")
            }
            LockState::Locked | LockState::Authenticating => Reply::success("already locked"),
        }
    }

    fn deactivate<D: GrabPort + StatusPort>(&mut self, display: &mut D, now: Moment) -> Reply {
        self.idle.touch(now.at);
        if self.state == LockState::Unblanked {
            self.reset_power_timer();
            return Reply::success("deactivating");
        }
        // Explicit requests skip the debounce window.
        self.times.ignore_activity_before = now.at;
        self.evaluate(display, now);
        Reply::success("deactivating")
    }

    fn reset_power_timer(&mut self) {
        let Some((program, args)) = self.policy.programs.power_reset.split_first() else {
            return;
        };
        let program = program.clone();
        let args = args.to_vec();
        self.children.spawn(Role::Utility, &program, &args);
    }

    /// Grab, start the renderer, publish. Abandoned if the keyboard grab
    /// fails.
    fn blank<D: GrabPort + StatusPort>(
        &mut self,
        display: &mut D,
        now: Moment,
        request: BlankRequest,
    ) -> bool {
        if !self.grabs.acquire(display, CursorShape::Blank) {
            if !request.forced {
                self.grab_retry_at = Some(now.at + GRAB_RETRY_BACKOFF);
            }
            warn!(forced = request.forced, "Not blanking: couldn't grab input");
            return false;
        }
        self.grab_retry_at = None;

        self.children.reset_respawn_guard();
        self.selection = request.selection;
        self.launch_renderer(request.emergency);

        self.times.mark_blanked(now.at);
        self.times.since = now.unix;
        if request.forced {
            self.debounce(now);
            self.idle.set_ignore_motion(true);
        } else {
            self.times.ignore_activity_before = now.at;
        }

        self.state = if request.lock {
            LockState::Locked
        } else {
            LockState::Blanked
        };
        info!(state = ?self.state, "Screen blanked");
        self.publish(display);
        true
    }

    fn enter_locked<D: GrabPort + StatusPort>(&mut self, display: &mut D, now: Moment) {
        self.state = LockState::Locked;
        self.times.since = now.unix;
        info!("Screen locked");
        self.publish(display);
    }

    fn authenticate<D: GrabPort + StatusPort>(&mut self, display: &mut D) {
        info!("Activity while locked; starting authenticator");
        self.state = LockState::Authenticating;
        let args = self.policy.child_args.authenticator(false);
        let program = self.policy.programs.authenticator.clone();
        self.children.spawn(Role::Authenticator, &program, &args);
        self.grabs.regrab_pointer(display, CursorShape::Busy);
    }

    fn unblank<D: GrabPort + StatusPort>(&mut self, display: &mut D, now: Moment) {
        self.children.kill(Role::Renderer);
        self.children.kill(Role::Authenticator);
        self.grabs.release(display);
        self.children.reset_respawn_guard();
        self.idle.set_ignore_motion(false);
        self.idle.touch(now.at);
        self.state = LockState::Unblanked;
        self.times.since = now.unix;
        info!("Screen unblanked");
        self.publish(display);
    }

    fn debounce(&mut self, now: Moment) {
        self.times.ignore_activity_before = now.at + DEBOUNCE;
    }

    fn launch_renderer(&mut self, emergency: bool) {
        let launch = RendererLaunch {
            init: !self.renderer_launched,
            emergency,
            selection: self.selection,
        };
        self.renderer_launched = true;
        let args = self.policy.child_args.renderer(launch);
        let program = self.policy.programs.renderer.clone();
        self.children.spawn(Role::Renderer, &program, &args);
    }

    fn publish<D: StatusPort>(&mut self, display: &mut D) {
        self.status
            .publish(display, self.state.status_mode(), self.times.since);
    }

    /// Reap children and act on the ones the machine cares about.
    pub fn reap_children<D: GrabPort + StatusPort>(&mut self, display: &mut D, now: Moment) {
        for reaped in self.children.reap_all() {
            self.on_reaped(display, &reaped, now);
        }
    }

    fn on_reaped<D: GrabPort + StatusPort>(&mut self, display: &mut D, reaped: &Reaped, now: Moment) {
        match reaped.role {
            Some(Role::Renderer) => {
                let decision = self
                    .children
                    .renderer_respawn(reaped, self.state.holds_grab());
                if decision == RespawnDecision::Respawn {
                    self.launch_renderer(true);
                }
            }
            Some(Role::Authenticator) => {
                if reaped.expected || self.state != LockState::Authenticating {
                    return;
                }
                if !reaped.exit.is_terminal() {
                    return;
                }
                if reaped.exit.is_auth_success() {
                    info!("Authentication succeeded");
                    self.unblank(display, now);
                } else {
                    info!(exit = %reaped.exit, "Authentication failed");
                    self.state = LockState::Locked;
                    self.debounce(now);
                    self.grabs.regrab_pointer(display, CursorShape::Blank);
                }
            }
            Some(Role::IdleHelper) | Some(Role::Utility) | None => {}
        }
    }

    /// Act on one batch of drained signals. Terminate always wins, even
    /// while locked. Hang-up restarts unless the screen is locked. Returns
    /// the control the loop must follow, if any.
    pub fn on_signals<D: GrabPort + StatusPort>(
        &mut self,
        display: &mut D,
        pending: PendingSignals,
        now: Moment,
    ) -> Option<Control> {
        if pending.terminate {
            if self.state.is_locked() {
                warn!("Terminated while locked; unlocking on the way out");
            }
            info!("Terminating");
            self.shutdown(display, now);
            return Some(Control::Exit);
        }
        if pending.hangup {
            if self.state.is_locked() {
                warn!("Ignoring SIGHUP while locked");
            } else {
                info!("SIGHUP received; restarting");
                self.shutdown(display, now);
                return Some(Control::Restart);
            }
        }
        if pending.child || self.children.has_pending() {
            self.reap_children(display, now);
        }
        None
    }

    /// Terminate every child, drop the grabs and publish Unblanked. Used
    /// before exit or restart.
    pub fn shutdown<D: GrabPort + StatusPort>(&mut self, display: &mut D, now: Moment) {
        self.children.kill_all();
        self.grabs.release(display);
        if self.state != LockState::Unblanked {
            self.state = LockState::Unblanked;
            self.times.since = now.unix;
        }
        self.publish(display);
    }
}
