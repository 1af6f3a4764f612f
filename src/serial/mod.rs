//! # Serial Module
//!
//! Serial sessions and the manager that keeps at most one of them open.

pub mod auto_connect;
pub mod listeners;
pub mod manager;
pub mod options;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use auto_connect::{AutoConnect, COM_PORT_ARG, launch_port};
pub use listeners::{ListenerHandle, SessionListeners};
pub use manager::{ActiveSession, SessionManager, port_choices};
pub use options::{COMMON_BAUD_RATES, DataBits, Parity, SerialOptions, StopBits};
pub use session::{CloseCallback, NOT_CONNECTED, SerialSession, State, is_valid_path};
pub use transport::{TokioSerial, Transport, available_ports};
