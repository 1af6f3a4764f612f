//! # Config Module
//!
//! Terminal settings persisted as RON between runs:
//! - Loaded once on startup; a missing file yields defaults
//! - An unreadable file is logged and replaced by defaults
//! - Saved back on exit with whatever the user selected

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SessionError};
use crate::serial::SerialOptions;
use crate::terminal::Mode;

/// Default configuration file path.
pub const CONFIG_FILE: &str = "config/serial_terminal.ron";

/// Persisted terminal settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Last selected port.
    pub port: Option<String>,
    pub options: SerialOptions,
    pub mode: Mode,
    pub clear_on_send: bool,
    /// Appended to every submitted line in line mode.
    pub line_ending: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            port: None,
            options: SerialOptions::default(),
            mode: Mode::Line,
            clear_on_send: true,
            line_ending: "\r\n".to_string(),
        }
    }
}

impl TerminalConfig {
    pub fn default_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Reads and parses `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        ron::from_str(&data).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Loads `path`, falling back to defaults when it is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => {
                info!("Loaded terminal config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to load {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let data = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SessionError::Config(e.to_string()))?;
        fs::write(path, data)?;
        info!("Saved terminal config to {}", path.display());
        Ok(())
    }
}
