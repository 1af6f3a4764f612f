//! # Serial Terminal
//!
//! A serial port terminal with two input modes.
//!
//! This crate keeps at most one serial session open at a time and drives it
//! from a terminal that either submits whole lines or forwards every
//! keystroke to a remote shell.
//!
//! ## Features
//!
//! - **Single Active Session**: Reconfiguring closes the old port and waits
//!   for the close before the new port is opened.
//! - **Fan-out Events**: Any number of listeners receive every `opened` and
//!   data event exactly once.
//! - **Line and Shell Modes**: Local echo and submitted lines, or raw
//!   keystrokes with the remote end echoing.
//! - **Best-effort I/O**: Open and write failures are logged, never raised
//!   into the caller.
//! - **Auto-connect**: `--comPort <path>` connects once at start-up.
//!
//! ## Architecture
//!
//! - [`serial`]: Sessions, the transport boundary and the session manager
//! - [`terminal`]: The mode controller and the console front end
//! - [`config`]: Persisted terminal settings
//! - [`app`]: Command-line entry point
//! - [`error`]: Custom error types for the application

pub mod app;
pub mod config;
pub mod error;
pub mod serial;
pub mod terminal;

/// Re-exports for convenience
pub mod prelude {
    pub use crate::error::*;
    pub use crate::serial::{SerialOptions, SerialSession, SessionManager, TokioSerial};
    pub use crate::terminal::{DisplaySink, Mode, ModeController, SessionWriter};
}
