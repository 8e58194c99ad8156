//! The event loop.
//!
//! One iteration: drain signals, reap children, drain X events in arrival
//! order, re-check the config, evaluate the lock machine, then block until
//! the display is readable or the next deadline passes.

use std::ffi::OsString;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command as Process;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use x_session::{SessionError, SessionEvent, XSession};

use crate::args::EnvSet;
use crate::config::ConfigStore;
use crate::display::XDisplay;
use crate::grab::GrabManager;
use crate::idle::Activity;
use crate::lock::{Control, LockStateMachine, Moment, Reply};
use crate::policy::{detect_locking_disabled, Environment, Overrides, Policy};
use crate::protocol::{decode_command, encode_reply, mode_atoms, VERSION};
use crate::signals::SignalLatch;
use crate::supervisor::ProcessLauncher;

/// Longest single wait, deadline or not.
pub const MAX_WAIT: Duration = Duration::from_secs(1);

/// Conditions that end the process before any grab is taken.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Display(#[from] SessionError),

    #[error("xlockd {version} is already running on display '{display}' ({id})")]
    AlreadyRunning {
        display: String,
        version: String,
        id: String,
    },

    #[error("Failed to install signal handlers: {0}")]
    Signals(#[source] io::Error),
}

pub struct DaemonOptions {
    pub display: Option<String>,
    pub store: ConfigStore,
    pub overrides: Overrides,
}

pub struct Daemon {
    session: XSession,
    store: ConfigStore,
    overrides: Overrides,
    signals: SignalLatch,
    machine: LockStateMachine<ProcessLauncher>,
}

impl Daemon {
    /// Open the display, refuse to run twice, and take ownership of the
    /// daemon window.
    pub fn start(options: DaemonOptions) -> Result<Self, StartupError> {
        let DaemonOptions {
            display,
            store,
            overrides,
        } = options;

        let mut session = XSession::connect(display.as_deref())?;
        if let Some(other) = session.find_daemon()? {
            return Err(StartupError::AlreadyRunning {
                display: session.display_name().to_string(),
                version: other.version,
                id: other.id,
            });
        }
        session.claim()?;
        session.publish_identity(VERSION, &identity())?;

        let environment = Environment::current(session.display_name(), session.vendor());
        let locking_disabled = detect_locking_disabled(&environment);
        if let Some(reason) = &locking_disabled {
            warn!(reason = %reason, "Locking disabled; lock requests will be refused");
        }
        let policy = Policy::new(store.get(), &overrides, locking_disabled);

        let signals = SignalLatch::new();
        signals.install().map_err(StartupError::Signals)?;

        let env = EnvSet::new()
            .with_display(session.display_name())
            .with_helper_path(&policy.helper_dir())
            .build();
        let launcher = ProcessLauncher::new(env, Some(session.fd()));
        let machine = LockStateMachine::new(
            policy,
            launcher,
            mode_atoms(session.atoms()),
            GrabManager::new(),
            Moment::now(),
        );

        info!(
            display = session.display_name(),
            window = session.window(),
            "Daemon window ready"
        );
        Ok(Self {
            session,
            store,
            overrides,
            signals,
            machine,
        })
    }

    /// Run until an exit or restart is called for. Children are killed on
    /// every way out, including a lost connection.
    pub fn run(self) -> Result<Control, SessionError> {
        let mut daemon = scopeguard::guard(self, |mut daemon| {
            daemon.machine.children_mut().kill_all();
        });
        {
            let Daemon {
                session, machine, ..
            } = &mut *daemon;
            machine.start(&mut XDisplay::new(session), Moment::now());
            session.flush()?;
        }

        loop {
            if let Some(control) = daemon.drain_signals() {
                return Ok(control);
            }
            if let Some(control) = daemon.drain_events()? {
                return Ok(control);
            }

            daemon.reload_config();
            let Daemon {
                session, machine, ..
            } = &mut *daemon;
            machine.evaluate(&mut XDisplay::new(session), Moment::now());
            session.flush()?;

            let queued = session.has_pending_event()?;
            let timeout = wait_timeout(machine.next_deadline(), Instant::now(), queued);
            session
                .wait_readable(timeout)
                .map_err(|err| SessionError::Connection(err.into()))?;
        }
    }

    fn drain_signals(&mut self) -> Option<Control> {
        let pending = self.signals.drain();
        let mut display = XDisplay::new(&self.session);
        self.machine.on_signals(&mut display, pending, Moment::now())
    }

    fn drain_events(&mut self) -> Result<Option<Control>, SessionError> {
        loop {
            let event = match self.session.poll_event() {
                Ok(Some(event)) => event,
                Ok(None) => return Ok(None),
                Err(err) if err.is_connection_lost() => return Err(err),
                Err(err) => {
                    warn!(error = %err, "Dropping event");
                    continue;
                }
            };
            let control = self.handle_event(event);
            if control != Control::Continue {
                return Ok(Some(control));
            }
        }
    }

    fn handle_event(&mut self, event: SessionEvent) -> Control {
        let now = Instant::now();
        match event {
            SessionEvent::Key(_) => self.machine.record_activity(Activity::Key, now),
            SessionEvent::Button(_) => self.machine.record_activity(Activity::Button, now),
            SessionEvent::Motion { root_x, root_y, .. } => self.machine.record_activity(
                Activity::Motion {
                    x: root_x,
                    y: root_y,
                },
                now,
            ),
            SessionEvent::RawMotion => {
                if self.machine.idle().wants_motion_sample(now) {
                    match self.session.pointer_position() {
                        Ok((x, y)) => self.machine.record_activity(Activity::Motion { x, y }, now),
                        Err(err) => warn!(error = %err, "Couldn't query the pointer"),
                    }
                }
            }
            SessionEvent::Command { window, kind, arg } => {
                self.reload_config();
                let mut display = XDisplay::new(&self.session);
                let (reply, control) = match decode_command(self.session.atoms(), kind, arg) {
                    Some(command) => {
                        self.machine
                            .handle_command(&mut display, command, Moment::now())
                    }
                    None => {
                        warn!(kind, "Unrecognized command");
                        (Reply::failure("unrecognized command"), Control::Continue)
                    }
                };
                debug!(ok = reply.ok, message = %reply.message, "Replying");
                if let Err(err) = self.session.send_response(window, &encode_reply(&reply)) {
                    warn!(error = %err, "Couldn't send reply");
                }
                return control;
            }
            SessionEvent::ProtocolError { description } => {
                error!(description = %description, "X protocol error");
            }
            SessionEvent::Other => {}
        }
        Control::Continue
    }

    fn reload_config(&mut self) {
        match self.store.reload_if_changed() {
            Ok(true) => {
                info!(path = %self.store.path().display(), "Config reloaded");
                let policy = self
                    .machine
                    .policy()
                    .reloaded(self.store.get(), &self.overrides);
                self.machine.set_policy(policy);
            }
            Ok(false) => {}
            Err(err) => warn!(error = %err, "Keeping previous config"),
        }
    }
}

/// How long to block: until `deadline`, but never longer than [`MAX_WAIT`],
/// and not at all when events are already queued.
pub fn wait_timeout(deadline: Option<Instant>, now: Instant, events_queued: bool) -> Duration {
    if events_queued {
        return Duration::ZERO;
    }
    deadline
        .map(|at| at.saturating_duration_since(now))
        .unwrap_or(MAX_WAIT)
        .min(MAX_WAIT)
}

/// `"<pid> (<user>@<host>)"`.
fn identity() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| unsafe { libc::getuid() }.to_string());
    format!("{} ({}@{})", std::process::id(), user, hostname())
}

fn hostname() -> String {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return "localhost".to_string();
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

/// Replace this process with a fresh copy of itself. Only returns on
/// failure.
pub fn reexec() -> io::Error {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(err) => return err,
    };
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    info!(exe = %exe.display(), "Re-executing");
    Process::new(exe).args(args).exec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_are_capped() {
        let now = Instant::now();
        assert_eq!(wait_timeout(None, now, false), MAX_WAIT);
        assert_eq!(wait_timeout(Some(now + Duration::from_secs(30)), now, false), MAX_WAIT);
        assert_eq!(
            wait_timeout(Some(now + Duration::from_millis(200)), now, false),
            Duration::from_millis(200)
        );
        assert_eq!(
            wait_timeout(Some(now), now + Duration::from_secs(2), false),
            Duration::ZERO
        );
    }

    #[test]
    fn queued_events_skip_the_wait() {
        let now = Instant::now();
        assert_eq!(wait_timeout(None, now, true), Duration::ZERO);
        assert_eq!(wait_timeout(Some(now + Duration::from_secs(30)), now, true), Duration::ZERO);
    }

    #[test]
    fn identity_names_this_process() {
        assert!(identity().starts_with(&std::process::id().to_string()));
    }
}
