//! Owner of the single active serial session.
//!
//! Every reconfiguration goes through `&mut self`, so only one can be in
//! flight, and each one awaits the previous session's close before it opens
//! the next port.

use log::{error, info};
use std::sync::{Arc, Mutex};

use super::auto_connect::AutoConnect;
use super::listeners::{ListenerHandle, SessionListeners, lock};
use super::options::SerialOptions;
use super::session::{NOT_CONNECTED, SerialSession, is_valid_path};
use super::transport::Transport;
use crate::error::Result;

/// Shared view of whichever session is currently active.
///
/// Only the [`SessionManager`] replaces the session held here.
#[derive(Clone, Default)]
pub struct ActiveSession {
    slot: Arc<Mutex<Option<SerialSession>>>,
}

impl ActiveSession {
    pub fn get(&self) -> Option<SerialSession> {
        lock(&self.slot).clone()
    }

    pub fn is_open(&self) -> bool {
        self.get().is_some_and(|session| session.is_open())
    }

    /// Writes to the active session. Without one the write is logged and
    /// still reported as sent.
    pub fn write(&self, data: &str) -> bool {
        match self.get() {
            Some(session) => session.write(data),
            None => {
                error!("Failed to write to serial port: not connected");
                true
            }
        }
    }

    fn replace(&self, session: Option<SerialSession>) -> Option<SerialSession> {
        std::mem::replace(&mut *lock(&self.slot), session)
    }
}

/// Entries for a port selector: "Not connected" followed by every port, or
/// nothing at all when no port exists.
pub fn port_choices(available: &[String]) -> Vec<String> {
    if available.is_empty() {
        return Vec::new();
    }
    std::iter::once(NOT_CONNECTED.to_string())
        .chain(available.iter().cloned())
        .collect()
}

/// Opens, replaces and closes sessions on behalf of the front end.
pub struct SessionManager<T: Transport> {
    transport: Arc<T>,
    active: ActiveSession,
    listeners: Arc<SessionListeners>,
    selected_port: Option<String>,
    options: SerialOptions,
    auto_connect: AutoConnect,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: T, options: SerialOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            active: ActiveSession::default(),
            listeners: Arc::new(SessionListeners::new()),
            selected_port: None,
            options,
            auto_connect: AutoConnect::new(),
        }
    }

    /// Listens for `opened` on every session this manager opens.
    pub fn on_opened(&self, handler: impl Fn() + Send + Sync + 'static) -> ListenerHandle {
        self.listeners.on_opened(handler)
    }

    /// Listens for incoming data on every session this manager opens.
    pub fn on_data(&self, handler: impl Fn(&str) + Send + Sync + 'static) -> ListenerHandle {
        self.listeners.on_data(handler)
    }

    pub fn active(&self) -> ActiveSession {
        self.active.clone()
    }

    pub fn selected_port(&self) -> Option<&str> {
        self.selected_port.as_deref()
    }

    pub fn options(&self) -> &SerialOptions {
        &self.options
    }

    /// Switches to `port` with `options`.
    ///
    /// The current session, if any, is fully closed first. A missing, empty
    /// or "Not connected" port only disconnects.
    pub async fn apply(&mut self, port: Option<&str>, options: SerialOptions) -> Result<()> {
        self.selected_port = port.map(str::to_string);
        self.options = options;

        if let Some(previous) = self.active.replace(None) {
            previous.shutdown().await;
        }

        let Some(port) = port.filter(|port| is_valid_path(port)) else {
            info!("Serial port disconnected");
            return Ok(());
        };

        let session =
            SerialSession::with_listeners(port, self.options.clone(), Arc::clone(&self.listeners))?;
        self.active.replace(Some(session.clone()));
        session.open(Arc::clone(&self.transport))
    }

    pub async fn select_port(&mut self, port: Option<&str>) -> Result<()> {
        let options = self.options.clone();
        self.apply(port, options).await
    }

    pub async fn set_options(&mut self, options: SerialOptions) -> Result<()> {
        let port = self.selected_port.clone();
        self.apply(port.as_deref(), options).await
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        let options = self.options.clone();
        self.apply(None, options).await
    }

    /// Connects to the launch port once per manager, if it is available.
    ///
    /// Returns whether a connection was started.
    pub async fn auto_connect(
        &mut self,
        launch_port: Option<&str>,
        available: &[String],
    ) -> Result<bool> {
        match self.auto_connect.evaluate(launch_port, available) {
            Some(port) => {
                info!("Auto-connecting to '{port}'");
                self.select_port(Some(port.as_str())).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> Arc<T> {
        Arc::clone(&self.transport)
    }

    /// Closes the active session and drops the manager.
    pub async fn dispose(self) {
        if let Some(session) = self.active.replace(None) {
            session.shutdown().await;
        }
    }
}
