//! Keyboard and pointer grabs.
//!
//! The daemon must never report "locked" while another client can still
//! receive input, so the keyboard grab is mandatory: without it, any pointer
//! grab that was obtained is given back and the caller is told to abandon the
//! transition.

use std::time::Duration;

use tracing::{debug, info, warn};

pub use x_session::{CursorShape, GrabOutcome};

/// Attempts per bounded round.
pub const GRAB_ATTEMPTS: u32 = 4;

/// Pause between attempts within a round.
pub const GRAB_PAUSE: Duration = Duration::from_millis(250);

/// What the grab manager needs from the display.
pub trait GrabPort {
    fn grab_keyboard(&mut self) -> GrabOutcome;
    /// Also used to change the cursor of a pointer grab already held.
    fn grab_pointer(&mut self, cursor: CursorShape) -> GrabOutcome;
    fn ungrab_keyboard(&mut self);
    fn ungrab_pointer(&mut self);
    /// Set the input focus to none.
    fn clear_focus(&mut self);
}

#[derive(Debug, Clone)]
pub struct GrabManager {
    attempts: u32,
    pause: Duration,
    keyboard_held: bool,
    pointer_held: bool,
}

impl GrabManager {
    pub fn new() -> Self {
        Self::with_retry(GRAB_ATTEMPTS, GRAB_PAUSE)
    }

    pub fn with_retry(attempts: u32, pause: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            pause,
            keyboard_held: false,
            pointer_held: false,
        }
    }

    /// True while the keyboard grab is held. The pointer grab is optional and
    /// does not count.
    pub fn is_held(&self) -> bool {
        self.keyboard_held
    }

    pub fn pointer_held(&self) -> bool {
        self.pointer_held
    }

    /// Take both grabs. Returns false, holding nothing, if the keyboard could
    /// not be grabbed.
    pub fn acquire<P: GrabPort>(&mut self, port: &mut P, cursor: CursorShape) -> bool {
        let mut keyboard = self.retry("keyboard", || port.grab_keyboard());
        if !keyboard.is_success() {
            info!(status = ?keyboard, "Keyboard grab refused; clearing input focus and retrying");
            port.clear_focus();
            keyboard = self.retry("keyboard", || port.grab_keyboard());
        }

        let pointer = self.retry("pointer", || port.grab_pointer(cursor));

        if !keyboard.is_success() {
            if pointer.is_success() {
                port.ungrab_pointer();
            }
            self.keyboard_held = false;
            self.pointer_held = false;
            warn!(status = ?keyboard, "Couldn't grab keyboard");
            return false;
        }

        if !pointer.is_success() {
            warn!(status = ?pointer, "Couldn't grab pointer; continuing with keyboard only");
        }
        self.keyboard_held = true;
        self.pointer_held = pointer.is_success();
        debug!(pointer = self.pointer_held, "Grabbed input");
        true
    }

    /// Re-take the pointer grab with a different cursor. Failure leaves the
    /// keyboard grab in place and is only logged.
    pub fn regrab_pointer<P: GrabPort>(&mut self, port: &mut P, cursor: CursorShape) -> bool {
        let pointer = self.retry("pointer", || port.grab_pointer(cursor));
        if !pointer.is_success() {
            warn!(status = ?pointer, cursor = ?cursor, "Couldn't re-grab pointer");
        }
        self.pointer_held = pointer.is_success();
        self.pointer_held
    }

    /// Release both grabs. Safe to call when nothing is held.
    pub fn release<P: GrabPort>(&mut self, port: &mut P) {
        port.ungrab_pointer();
        port.ungrab_keyboard();
        if self.keyboard_held || self.pointer_held {
            debug!("Released input grabs");
        }
        self.keyboard_held = false;
        self.pointer_held = false;
    }

    fn retry(&self, what: &str, mut attempt: impl FnMut() -> GrabOutcome) -> GrabOutcome {
        let mut outcome = GrabOutcome::Failed;
        for n in 1..=self.attempts {
            outcome = attempt();
            if outcome.is_success() {
                return outcome;
            }
            debug!(what, attempt = n, status = ?outcome, "Grab attempt failed");
            if n < self.attempts && !self.pause.is_zero() {
                std::thread::sleep(self.pause);
            }
        }
        outcome
    }
}

impl Default for GrabManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Scripted {
        keyboard: VecDeque<GrabOutcome>,
        pointer: VecDeque<GrabOutcome>,
        calls: Vec<&'static str>,
    }

    impl GrabPort for Scripted {
        fn grab_keyboard(&mut self) -> GrabOutcome {
            self.calls.push("grab_keyboard");
            self.keyboard.pop_front().unwrap_or(GrabOutcome::Success)
        }
        fn grab_pointer(&mut self, _cursor: CursorShape) -> GrabOutcome {
            self.calls.push("grab_pointer");
            self.pointer.pop_front().unwrap_or(GrabOutcome::Success)
        }
        fn ungrab_keyboard(&mut self) {
            self.calls.push("ungrab_keyboard");
        }
        fn ungrab_pointer(&mut self) {
            self.calls.push("ungrab_pointer");
        }
        fn clear_focus(&mut self) {
            self.calls.push("clear_focus");
        }
    }

    fn manager() -> GrabManager {
        GrabManager::with_retry(GRAB_ATTEMPTS, Duration::ZERO)
    }

    #[test]
    fn focus_is_cleared_once_after_a_failed_round() {
        let mut port = Scripted {
            keyboard: vec![GrabOutcome::AlreadyGrabbed; 4].into(),
            ..Default::default()
        };
        let mut grabs = manager();

        assert!(grabs.acquire(&mut port, CursorShape::Blank));
        let focus_at = port.calls.iter().position(|c| *c == "clear_focus").unwrap();
        assert_eq!(focus_at, 4);
        assert!(grabs.is_held());
    }

    #[test]
    fn keyboard_failure_gives_back_the_pointer() {
        let mut port = Scripted {
            keyboard: vec![GrabOutcome::AlreadyGrabbed; 8].into(),
            ..Default::default()
        };
        let mut grabs = manager();

        assert!(!grabs.acquire(&mut port, CursorShape::Blank));
        let keyboard_tries = port.calls.iter().filter(|c| **c == "grab_keyboard").count();
        assert_eq!(keyboard_tries, 8);
        assert_eq!(port.calls.last(), Some(&"ungrab_pointer"));
        assert!(!grabs.is_held());
        assert!(!grabs.pointer_held());
    }

    #[test]
    fn pointer_failure_is_tolerated() {
        let mut port = Scripted {
            pointer: vec![GrabOutcome::Frozen; 4].into(),
            ..Default::default()
        };
        let mut grabs = manager();

        assert!(grabs.acquire(&mut port, CursorShape::Blank));
        assert!(grabs.is_held());
        assert!(!grabs.pointer_held());
    }

    #[test]
    fn release_is_idempotent() {
        let mut port = Scripted::default();
        let mut grabs = manager();
        grabs.release(&mut port);
        grabs.release(&mut port);
        assert!(!grabs.is_held());
    }
}
