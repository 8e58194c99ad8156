//! Exit classification, decided once at reap time.

use std::fmt;

/// Exit code with which the authenticator reports accepted credentials.
pub const AUTH_SUCCESS_CODE: u8 = 200;

/// How a child left (or paused).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    /// Normal exit. The code is the raw 8-bit value reinterpreted as signed,
    /// so a child calling `exit(-1)` shows up as `Exited(-1)`.
    Exited(i8),
    /// Killed by this signal.
    Signaled(i32),
    /// Stopped by this signal; the process still exists.
    Stopped(i32),
}

impl ChildExit {
    /// Classify a raw `waitpid` status. Returns `None` for statuses that are
    /// none of exited/signaled/stopped (e.g. "continued").
    pub fn from_wait_status(status: libc::c_int) -> Option<Self> {
        if libc::WIFEXITED(status) {
            Some(ChildExit::Exited(libc::WEXITSTATUS(status) as u8 as i8))
        } else if libc::WIFSIGNALED(status) {
            Some(ChildExit::Signaled(libc::WTERMSIG(status)))
        } else if libc::WIFSTOPPED(status) {
            Some(ChildExit::Stopped(libc::WSTOPSIG(status)))
        } else {
            None
        }
    }

    /// The process no longer exists.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ChildExit::Stopped(_))
    }

    /// The single bit of protocol the authenticator speaks.
    pub fn is_auth_success(self) -> bool {
        matches!(self, ChildExit::Exited(code) if code as u8 == AUTH_SUCCESS_CODE)
    }
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildExit::Exited(code) => write!(f, "exited with code {}", code),
            ChildExit::Signaled(signal) => write!(f, "terminated with {}", signal_name(*signal)),
            ChildExit::Stopped(signal) => write!(f, "stopped with {}", signal_name(*signal)),
        }
    }
}

fn signal_name(signal: i32) -> String {
    match signal {
        libc::SIGHUP => "SIGHUP".into(),
        libc::SIGINT => "SIGINT".into(),
        libc::SIGQUIT => "SIGQUIT".into(),
        libc::SIGILL => "SIGILL".into(),
        libc::SIGTRAP => "SIGTRAP".into(),
        libc::SIGABRT => "SIGABRT".into(),
        libc::SIGBUS => "SIGBUS".into(),
        libc::SIGFPE => "SIGFPE".into(),
        libc::SIGKILL => "SIGKILL".into(),
        libc::SIGSEGV => "SIGSEGV".into(),
        libc::SIGPIPE => "SIGPIPE".into(),
        libc::SIGTERM => "SIGTERM".into(),
        libc::SIGSTOP => "SIGSTOP".into(),
        libc::SIGTSTP => "SIGTSTP".into(),
        libc::SIGCONT => "SIGCONT".into(),
        other => format!("signal {}", other),
    }
}
