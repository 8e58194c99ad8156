//! The process seam: everything the supervisor needs from the OS.

use std::io;
use std::os::unix::io::RawFd;
use std::os::unix::process::CommandExt;
use std::process::Command;

use thiserror::Error;

use super::exit::ChildExit;

pub type Pid = libc::pid_t;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Starts, signals and reaps child processes.
pub trait Launcher {
    /// Start `program` in its own process group.
    fn launch(&mut self, program: &str, args: &[String]) -> Result<Pid, LaunchError>;

    /// Send `signal` to the child's process group.
    fn signal(&mut self, pid: Pid, signal: i32) -> io::Result<()>;

    /// One non-blocking wait. `None` once nothing else has changed state.
    fn reap(&mut self) -> Option<(Pid, ChildExit)>;
}

/// [`Launcher`] backed by real processes.
pub struct ProcessLauncher {
    env: Vec<(String, String)>,
    display_fd: Option<RawFd>,
}

impl ProcessLauncher {
    /// `env` is applied on top of the inherited environment. `display_fd`,
    /// if given, is closed in the child before exec.
    pub fn new(env: Vec<(String, String)>, display_fd: Option<RawFd>) -> Self {
        Self { env, display_fd }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, program: &str, args: &[String]) -> Result<Pid, LaunchError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .process_group(0);

        if let Some(fd) = self.display_fd {
            // Only async-signal-safe calls are allowed between fork and exec.
            unsafe {
                command.pre_exec(move || {
                    libc::close(fd);
                    Ok(())
                });
            }
        }

        let child = command.spawn().map_err(|source| LaunchError::Spawn {
            program: program.to_string(),
            source,
        })?;
        Ok(child.id() as Pid)
    }

    fn signal(&mut self, pid: Pid, signal: i32) -> io::Result<()> {
        if unsafe { libc::kill(-pid, signal) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn reap(&mut self) -> Option<(Pid, ChildExit)> {
        loop {
            let mut status: libc::c_int = 0;
            let pid = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG | libc::WUNTRACED) };
            if pid == 0 {
                return None;
            }
            if pid < 0 {
                // EINTR is not a real error; anything else (ECHILD) means done.
                if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return None;
            }
            if let Some(exit) = ChildExit::from_wait_status(status) {
                return Some((pid, exit));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn reap_pid(launcher: &mut ProcessLauncher, pid: Pid) -> ChildExit {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some((reaped, exit)) = launcher.reap() {
                if reaped == pid {
                    return exit;
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("child {} was never reaped", pid);
    }

    // One test drives every real child: `waitpid(-1)` would otherwise let
    // parallel tests steal each other's exits.
    #[test]
    fn launches_signals_and_reaps_real_children() {
        let mut launcher = ProcessLauncher::new(Vec::new(), None);

        let pid = launcher
            .launch("/bin/sh", &["-c".into(), "exit 255".into()])
            .unwrap();
        assert_eq!(reap_pid(&mut launcher, pid), ChildExit::Exited(-1));

        let pid = launcher
            .launch("/bin/sh", &["-c".into(), "sleep 30".into()])
            .unwrap();
        launcher.signal(pid, libc::SIGTERM).unwrap();
        assert_eq!(
            reap_pid(&mut launcher, pid),
            ChildExit::Signaled(libc::SIGTERM)
        );

        let err = launcher
            .launch("/nonexistent/xlockd-test-binary", &[])
            .unwrap_err();
        assert!(err.to_string().contains("xlockd-test-binary"));
    }
}
