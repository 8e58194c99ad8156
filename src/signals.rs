//! Signal latch: OS signals become flags that the event loop drains.
//!
//! Handlers registered through `signal_hook::flag` do a single atomic store
//! and nothing else. Repeated delivery before a drain coalesces into one
//! "received" flag.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::signal::{SIGCHLD, SIGHUP, SIGINT, SIGQUIT, SIGTERM};

/// Signals drained during one loop iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingSignals {
    /// Hang-up: reload-and-restart request.
    pub hangup: bool,
    /// Terminate, interrupt or quit.
    pub terminate: bool,
    /// At least one child changed state.
    pub child: bool,
}

impl PendingSignals {
    pub fn any(&self) -> bool {
        self.hangup || self.terminate || self.child
    }
}

/// Process-wide flags, one per signal family. The event loop is the only
/// reader and clearer.
#[derive(Clone, Default)]
pub struct SignalLatch {
    hangup: Arc<AtomicBool>,
    terminate: Arc<AtomicBool>,
    child: Arc<AtomicBool>,
}

impl SignalLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handlers. Call once, before the first child is spawned.
    pub fn install(&self) -> io::Result<()> {
        signal_hook::flag::register(SIGHUP, Arc::clone(&self.hangup))?;
        for signal in [SIGTERM, SIGINT, SIGQUIT] {
            signal_hook::flag::register(signal, Arc::clone(&self.terminate))?;
        }
        signal_hook::flag::register(SIGCHLD, Arc::clone(&self.child))?;
        Ok(())
    }

    /// Take and clear every flag.
    pub fn drain(&self) -> PendingSignals {
        PendingSignals {
            hangup: self.hangup.swap(false, Ordering::SeqCst),
            terminate: self.terminate.swap(false, Ordering::SeqCst),
            child: self.child.swap(false, Ordering::SeqCst),
        }
    }

    /// Flags set by hand, for driving the loop without real signals.
    pub fn raise(&self, pending: PendingSignals) {
        if pending.hangup {
            self.hangup.store(true, Ordering::SeqCst);
        }
        if pending.terminate {
            self.terminate.store(true, Ordering::SeqCst);
        }
        if pending.child {
            self.child.store(true, Ordering::SeqCst);
        }
    }
}
