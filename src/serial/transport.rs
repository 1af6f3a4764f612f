//! Transport boundary.
//!
//! A session only needs something that can open a path into an async byte
//! stream. [`TokioSerial`] is the real serial port; tests plug in an
//! in-memory duplex instead.

use log::{info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{SerialPortBuilderExt, SerialStream, available_ports as system_ports};

use super::options::{DataBits, Parity, SerialOptions, StopBits};
use crate::error::{Result, SessionError};

/// Opens serial paths into byte streams.
pub trait Transport: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Opens `path`. Only the fields set in `options` may be applied.
    fn open(&self, path: &str, options: &SerialOptions) -> Result<Self::Stream>;
}

/// Transport backed by `tokio-serial`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSerial;

impl Transport for TokioSerial {
    type Stream = SerialStream;

    fn open(&self, path: &str, options: &SerialOptions) -> Result<SerialStream> {
        let mut builder = tokio_serial::new(path, options.baud_rate);
        if let Some(bits) = options.data_bits {
            builder = builder.data_bits(data_bits(bits));
        }
        if let Some(bits) = options.stop_bits {
            builder = builder.stop_bits(stop_bits(bits));
        }
        if let Some(parity) = options.parity {
            builder = builder.parity(parity_of(path, parity)?);
        }
        if let Some(flow) = flow_control(path, options) {
            builder = builder.flow_control(flow);
        }

        builder
            .open_native_async()
            .map_err(|e| SessionError::port_open(path, e.to_string()))
    }
}

fn data_bits(bits: DataBits) -> tokio_serial::DataBits {
    match bits {
        DataBits::Five => tokio_serial::DataBits::Five,
        DataBits::Six => tokio_serial::DataBits::Six,
        DataBits::Seven => tokio_serial::DataBits::Seven,
        DataBits::Eight => tokio_serial::DataBits::Eight,
    }
}

fn stop_bits(bits: StopBits) -> tokio_serial::StopBits {
    match bits {
        StopBits::One => tokio_serial::StopBits::One,
        StopBits::Two => tokio_serial::StopBits::Two,
    }
}

fn parity_of(path: &str, parity: Parity) -> Result<tokio_serial::Parity> {
    match parity {
        Parity::None => Ok(tokio_serial::Parity::None),
        Parity::Even => Ok(tokio_serial::Parity::Even),
        Parity::Odd => Ok(tokio_serial::Parity::Odd),
        Parity::Mark | Parity::Space => Err(SessionError::port_open(
            path,
            SessionError::unsupported(format!("{parity} parity")).to_string(),
        )),
    }
}

/// The serial backend has a single flow-control setting, so hardware flow
/// control wins over XON/XOFF and `xany` is ignored.
fn flow_control(path: &str, options: &SerialOptions) -> Option<tokio_serial::FlowControl> {
    if options.xany {
        warn!("'{path}': xany is not supported by this transport, ignoring");
    }
    if options.rtscts {
        if options.xon || options.xoff {
            warn!("'{path}': rts/cts requested together with xon/xoff, using rts/cts");
        }
        Some(tokio_serial::FlowControl::Hardware)
    } else if options.xon || options.xoff {
        Some(tokio_serial::FlowControl::Software)
    } else {
        None
    }
}

/// Names of the serial ports currently present on the system.
pub fn available_ports() -> Vec<String> {
    match system_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            info!("Error listing ports: {e}");
            Vec::new()
        }
    }
}
