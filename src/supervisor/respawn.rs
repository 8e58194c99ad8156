/// Consecutive renderer crashes tolerated while blanked.
pub const RESPAWN_CEILING: u32 = 5;

/// Bounds how often a crashing renderer is relaunched.
///
/// Each unexpected renderer death while blanked asks [`admit`](Self::admit)
/// for permission to respawn. Once the ceiling is reached every further
/// request is refused until [`reset`](Self::reset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespawnGuard {
    attempts: u32,
    ceiling: u32,
}

impl RespawnGuard {
    pub fn new(ceiling: u32) -> Self {
        Self {
            attempts: 0,
            ceiling,
        }
    }

    /// Count one crash; true if a respawn is still allowed.
    pub fn admit(&mut self) -> bool {
        if self.attempts >= self.ceiling {
            return false;
        }
        self.attempts += 1;
        true
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.ceiling
    }
}

impl Default for RespawnGuard {
    fn default() -> Self {
        Self::new(RESPAWN_CEILING)
    }
}
