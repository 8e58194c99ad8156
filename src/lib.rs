//! xlockd: an X11 screen-lock daemon.
//!
//! The daemon blanks the screen after an idle timeout, optionally locks it,
//! and holds the keyboard and pointer grabs that make locking meaningful.
//! Rendering and authentication happen in supervised child processes; this
//! crate decides when they run.

pub mod args;
pub mod client;
pub mod config;
pub mod daemon;
pub mod display;
pub mod grab;
pub mod idle;
pub mod lock;
pub mod logging;
pub mod policy;
pub mod protocol;
pub mod signals;
pub mod status;
pub mod supervisor;
