//! # Error Module
//!
//! This module provides the error type for `serial_terminal`.
//! It uses the `thiserror` crate for ergonomic error handling.
//!
//! Most serial failures are deliberately not surfaced as `Err` values: a port
//! that fails to open or a write that fails is logged and the session carries
//! on. The variants below are still used to build those log messages, and are
//! returned for configuration problems and structural misuse.

use thiserror::Error;

/// Result type alias for `serial_terminal` operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Main error type for `serial_terminal`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Failed to open serial port.
    #[error("Failed to open serial port '{port_name}': {reason}")]
    PortOpen { port_name: String, reason: String },

    /// Failed to write to serial port.
    #[error("Failed to write to serial port '{port_name}': {reason}")]
    PortWrite { port_name: String, reason: String },

    /// The path is empty or names the "Not connected" entry.
    #[error("Invalid serial port path: '{0}'")]
    InvalidPath(String),

    /// A session was asked to open while it was not closed.
    #[error("Serial port '{0}' is already open")]
    AlreadyOpen(String),

    /// The transport cannot express the requested option.
    #[error("Unsupported serial option: {0}")]
    UnsupportedOption(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed or serialized.
    #[error("Configuration format error: {0}")]
    Config(String),

    /// File I/O error.
    #[error("File I/O error: {0}")]
    FileIo(#[from] std::io::Error),
}

impl SessionError {
    /// Creates a new port open error.
    #[must_use]
    pub fn port_open(port_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PortOpen {
            port_name: port_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new port write error.
    #[must_use]
    pub fn port_write(port_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PortWrite {
            port_name: port_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new unsupported option error.
    #[must_use]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOption(msg.into())
    }

    /// Creates a new invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_open_error() {
        let error = SessionError::port_open("/dev/ttyUSB0", "Permission denied");
        let msg = error.to_string();
        assert!(msg.contains("/dev/ttyUSB0"));
        assert!(msg.contains("Permission denied"));
    }

    #[test]
    fn test_port_write_error() {
        let error = SessionError::port_write("COM3", "Broken pipe");
        let msg = error.to_string();
        assert!(msg.contains("COM3"));
        assert!(msg.contains("Broken pipe"));
    }

    #[test]
    fn test_invalid_path_error() {
        let error = SessionError::InvalidPath("Not connected".to_string());
        assert!(error.to_string().contains("Not connected"));
    }

    #[test]
    fn test_unsupported_error() {
        let error = SessionError::unsupported("mark parity");
        assert!(error.to_string().contains("mark parity"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: SessionError = io.into();
        assert!(matches!(error, SessionError::FileIo(_)));
    }
}
