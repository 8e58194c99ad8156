//! The status property on the root window.
//!
//! Layout: `[mode, since, per-monitor ids...]`. `mode` is 0, or the atom id
//! of `BLANK` or `LOCK`; `since` is the Unix time the mode began. Slots from
//! index 2 belong to the renderer and are carried through unchanged.

use tracing::debug;

/// What the status property needs from the display.
pub trait StatusPort {
    /// Current property value; empty when unset or unreadable.
    fn read_status(&mut self) -> Vec<u32>;
    fn write_status(&mut self, values: &[u32]);
}

/// Externally visible mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMode {
    Unblanked,
    Blanked,
    Locked,
}

/// Atom ids standing for the non-zero modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeAtoms {
    pub blank: u32,
    pub lock: u32,
}

impl ModeAtoms {
    fn encode(&self, mode: StatusMode) -> u32 {
        match mode {
            StatusMode::Unblanked => 0,
            StatusMode::Blanked => self.blank,
            StatusMode::Locked => self.lock,
        }
    }

    fn decode(&self, value: u32) -> Option<StatusMode> {
        match value {
            0 => Some(StatusMode::Unblanked),
            v if v == self.blank => Some(StatusMode::Blanked),
            v if v == self.lock => Some(StatusMode::Locked),
            _ => None,
        }
    }
}

/// Decoded status property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub mode: StatusMode,
    pub since: u32,
    pub trailing: Vec<u32>,
}

/// Rewrite the first two slots of `existing`, keeping the rest.
pub fn encode(atoms: &ModeAtoms, mode: StatusMode, since: u32, existing: &[u32]) -> Vec<u32> {
    let mut values = Vec::with_capacity(existing.len().max(2));
    values.push(atoms.encode(mode));
    values.push(since);
    values.extend(existing.iter().skip(2));
    values
}

/// `None` for a property too short to hold a status or with an unknown mode.
pub fn decode(atoms: &ModeAtoms, values: &[u32]) -> Option<Status> {
    let [mode, since, trailing @ ..] = values else {
        return None;
    };
    Some(Status {
        mode: atoms.decode(*mode)?,
        since: *since,
        trailing: trailing.to_vec(),
    })
}

#[derive(Debug, Clone)]
pub struct StatusPublisher {
    atoms: ModeAtoms,
    last: Option<(StatusMode, u32)>,
}

impl StatusPublisher {
    pub fn new(atoms: ModeAtoms) -> Self {
        Self { atoms, last: None }
    }

    pub fn atoms(&self) -> &ModeAtoms {
        &self.atoms
    }

    /// Last `(mode, since)` written by this process.
    pub fn last(&self) -> Option<(StatusMode, u32)> {
        self.last
    }

    /// Read-modify-write of the property. The write is a single request, so
    /// the renderer's slots are never observed half-updated.
    pub fn publish<P: StatusPort>(&mut self, port: &mut P, mode: StatusMode, since: u32) {
        let existing = port.read_status();
        let values = encode(&self.atoms, mode, since, &existing);
        if values != existing {
            port.write_status(&values);
        }
        debug!(mode = ?mode, since, "Published status");
        self.last = Some((mode, since));
    }
}
