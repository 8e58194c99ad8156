use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::status::StatusMode;

/// The daemon's one mutable mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Unblanked,
    Blanked,
    Locked,
    Authenticating,
}

impl LockState {
    /// Grabs are held in every state but `Unblanked`.
    pub fn holds_grab(self) -> bool {
        self != LockState::Unblanked
    }

    /// Locked or prompting; restart and exit requests are refused.
    pub fn is_locked(self) -> bool {
        matches!(self, LockState::Locked | LockState::Authenticating)
    }

    pub fn status_mode(self) -> StatusMode {
        match self {
            LockState::Unblanked => StatusMode::Unblanked,
            LockState::Blanked => StatusMode::Blanked,
            LockState::Locked | LockState::Authenticating => StatusMode::Locked,
        }
    }
}

/// A point in time on both clocks: monotonic for arithmetic, Unix seconds
/// for what is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    pub at: Instant,
    pub unix: u32,
}

impl Moment {
    pub fn now() -> Self {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        Self {
            at: Instant::now(),
            unix,
        }
    }

    pub fn after(self, elapsed: Duration) -> Self {
        Self {
            at: self.at + elapsed,
            unix: self.unix.saturating_add(elapsed.as_secs() as u32),
        }
    }
}

/// Times the machine keeps besides `active_at`, which lives in
/// [`IdleEvidence`](crate::idle::IdleEvidence).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamps {
    /// Start of the current (or last) blank. Never moves backwards.
    pub blanked_at: Option<Instant>,
    /// Activity older than this is not fresh.
    pub ignore_activity_before: Instant,
    /// Unix time the published mode began.
    pub since: u32,
}

impl Timestamps {
    pub fn new(now: Moment) -> Self {
        Self {
            blanked_at: None,
            ignore_activity_before: now.at,
            since: now.unix,
        }
    }

    pub(crate) fn mark_blanked(&mut self, now: Instant) {
        self.blanked_at = Some(match self.blanked_at {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }
}
