//! The lock state machine.
//!
//! ```text
//! Unblanked ──idle / activate──→ Blanked ──lock timeout / lock──→ Locked
//!     ↑                              │                              │
//!     └────────fresh activity────────┘                        fresh activity
//!     ↑                                                             ↓
//!     └──────────auth success───────── Authenticating ──auth failure──→ Locked
//! ```

mod intent;
mod machine;
mod state;

pub use intent::{Command, Control, Reply};
pub use machine::{LockStateMachine, DEBOUNCE, GRAB_RETRY_BACKOFF};
pub use state::{LockState, Moment, Timestamps};
