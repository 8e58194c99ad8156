//! X11 plumbing for the xlockd daemon and its control client.
//!
//! Nothing in this crate makes a locking decision. It opens the display,
//! interns the protocol atoms, owns the daemon's private window and cursors,
//! issues grab requests, reads and writes the well-known properties, and
//! turns raw X events into [`SessionEvent`]s.

mod atoms;
mod error;
mod event;
mod grab;
mod props;
mod session;
mod wait;

pub use atoms::Atoms;
pub use error::SessionError;
pub use event::{InputChannel, SessionEvent};
pub use grab::{CursorShape, GrabOutcome};
pub use props::DaemonWindow;
pub use session::XSession;

/// X resource id of a window.
pub type WindowId = u32;
