//! # Terminal Module
//!
//! The interaction protocol between a user, a display and a serial session:
//! - [`ModeController`]: line mode and shell mode input handling
//! - [`DisplaySink`]: where output is rendered
//! - [`SessionWriter`]: where priming bytes are written
//! - [`ConsoleDisplay`] and [`keys`]: the console front end used by the binary

pub mod controller;
pub mod display;
pub mod keys;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::serial::{ActiveSession, SerialSession};

pub use controller::{CommandCallback, ModeController, PRIME_SHELL};
pub use display::ConsoleDisplay;

/// terminal input mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Whole lines are typed locally and submitted at once.
    #[default]
    Line,
    /// Every keystroke goes straight to a remote shell that echoes it.
    Shell,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Line => write!(f, "line"),
            Mode::Shell => write!(f, "shell"),
        }
    }
}

/// Rendering surface for terminal output.
#[cfg_attr(test, mockall::automock)]
pub trait DisplaySink {
    fn write(&mut self, text: &str);
    fn clear(&mut self);
    fn erase_current_line_and_home_cursor(&mut self);
}

/// Write path into a serial session.
#[cfg_attr(test, mockall::automock)]
pub trait SessionWriter {
    fn write(&self, data: &str) -> bool;
    fn is_open(&self) -> bool;
}

impl SessionWriter for SerialSession {
    fn write(&self, data: &str) -> bool {
        SerialSession::write(self, data)
    }

    fn is_open(&self) -> bool {
        SerialSession::is_open(self)
    }
}

impl SessionWriter for ActiveSession {
    fn write(&self, data: &str) -> bool {
        ActiveSession::write(self, data)
    }

    fn is_open(&self) -> bool {
        ActiveSession::is_open(self)
    }
}
