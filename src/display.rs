//! The live X session behind the grab and status ports.
//!
//! Failures here are logged, never propagated: once a grab may be in
//! effect, a protocol error must not take the daemon down. A connection that
//! is really gone shows up on the next event poll.

use tracing::{error, warn};
use x_session::{CursorShape, GrabOutcome, SessionError, XSession};

use crate::grab::GrabPort;
use crate::status::StatusPort;

pub struct XDisplay<'a> {
    session: &'a XSession,
}

impl<'a> XDisplay<'a> {
    pub fn new(session: &'a XSession) -> Self {
        Self { session }
    }
}

fn report(what: &str, err: SessionError) {
    if err.is_connection_lost() {
        error!(error = %err, "{} failed: X connection lost", what);
    } else {
        warn!(error = %err, "{} failed", what);
    }
}

impl GrabPort for XDisplay<'_> {
    fn grab_keyboard(&mut self) -> GrabOutcome {
        self.session.grab_keyboard()
    }

    fn grab_pointer(&mut self, cursor: CursorShape) -> GrabOutcome {
        self.session.grab_pointer(cursor)
    }

    fn ungrab_keyboard(&mut self) {
        if let Err(err) = self.session.ungrab_keyboard() {
            report("Keyboard ungrab", err);
        }
    }

    fn ungrab_pointer(&mut self) {
        if let Err(err) = self.session.ungrab_pointer() {
            report("Pointer ungrab", err);
        }
    }

    fn clear_focus(&mut self) {
        if let Err(err) = self.session.clear_focus() {
            report("Clearing input focus", err);
        }
    }
}

impl StatusPort for XDisplay<'_> {
    fn read_status(&mut self) -> Vec<u32> {
        self.session.read_status().unwrap_or_else(|err| {
            report("Reading status property", err);
            Vec::new()
        })
    }

    fn write_status(&mut self, values: &[u32]) {
        if let Err(err) = self.session.write_status(values) {
            report("Writing status property", err);
        }
    }
}
