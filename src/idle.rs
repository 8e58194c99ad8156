//! Evidence of user presence.
//!
//! Fed from both the grabbed channel and the raw XInput2 channel, so idle
//! time keeps counting whether or not we hold the grab.

use std::time::{Duration, Instant};

/// Pointer positions are compared at most this often.
pub const MOTION_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// One input event, reduced to what counts as presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Key,
    Button,
    Motion { x: i32, y: i32 },
}

#[derive(Debug, Clone)]
pub struct IdleEvidence {
    active_at: Instant,
    hysteresis: u32,
    last_position: Option<(i32, i32)>,
    last_sample_at: Option<Instant>,
    ignore_motion: bool,
}

impl IdleEvidence {
    pub fn new(now: Instant, hysteresis: u32) -> Self {
        Self {
            active_at: now,
            hysteresis,
            last_position: None,
            last_sample_at: None,
            ignore_motion: false,
        }
    }

    /// Last time the user was seen.
    pub fn active_at(&self) -> Instant {
        self.active_at
    }

    pub fn set_hysteresis(&mut self, pixels: u32) {
        self.hysteresis = pixels;
    }

    /// Stop (or resume) counting pointer motion as presence.
    pub fn set_ignore_motion(&mut self, ignore: bool) {
        self.ignore_motion = ignore;
    }

    pub fn ignores_motion(&self) -> bool {
        self.ignore_motion
    }

    /// Mark the user present now, regardless of input.
    pub fn touch(&mut self, now: Instant) {
        self.active_at = now;
    }

    /// True if a motion event at `now` would be compared against the last
    /// sample. Lets the caller skip looking up the pointer position.
    pub fn wants_motion_sample(&self, now: Instant) -> bool {
        self.last_sample_at
            .map_or(true, |sampled| now.saturating_duration_since(sampled) >= MOTION_SAMPLE_INTERVAL)
    }

    /// Account for one event. Returns true if it moved `active_at`.
    pub fn record(&mut self, activity: Activity, now: Instant) -> bool {
        match activity {
            Activity::Key | Activity::Button => {
                self.ignore_motion = false;
                self.active_at = now;
                true
            }
            Activity::Motion { x, y } => self.record_motion(x, y, now),
        }
    }

    fn record_motion(&mut self, x: i32, y: i32, now: Instant) -> bool {
        if !self.wants_motion_sample(now) {
            return false;
        }
        let previous = self.last_position.replace((x, y));
        self.last_sample_at = Some(now);

        let Some((px, py)) = previous else {
            return false;
        };
        let distance = (x - px).unsigned_abs() + (y - py).unsigned_abs();
        if distance <= self.hysteresis || self.ignore_motion {
            return false;
        }
        self.active_at = now;
        true
    }
}
