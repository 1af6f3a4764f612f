//! In-memory transport for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::sync::mpsc::UnboundedReceiver;

use super::listeners::lock;
use super::options::SerialOptions;
use super::transport::Transport;
use crate::error::{Result, SessionError};

const WAIT: Duration = Duration::from_secs(1);

/// Every open hands the session one end of a duplex pipe and keeps the other
/// end as the "device" for the test to drive.
pub(crate) struct Loopback {
    devices: Mutex<HashMap<String, DuplexStream>>,
    failing: Mutex<HashSet<String>>,
    opened: Mutex<Vec<(String, SerialOptions)>>,
    opens: AtomicUsize,
}

impl Loopback {
    pub(crate) fn new() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            opened: Mutex::new(Vec::new()),
            opens: AtomicUsize::new(0),
        }
    }

    /// Makes every later open of `path` fail.
    pub(crate) fn fail(&self, path: &str) {
        lock(&self.failing).insert(path.to_string());
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn opened(&self) -> Vec<(String, SerialOptions)> {
        lock(&self.opened).clone()
    }

    /// Waits for `path` to be opened and takes its device end.
    pub(crate) async fn device(&self, path: &str) -> DuplexStream {
        tokio::time::timeout(WAIT, async {
            loop {
                if let Some(device) = lock(&self.devices).remove(path) {
                    return device;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("device was never opened")
    }
}

impl Transport for Loopback {
    type Stream = DuplexStream;

    fn open(&self, path: &str, options: &SerialOptions) -> Result<DuplexStream> {
        if lock(&self.failing).contains(path) {
            return Err(SessionError::port_open(path, "No such file or directory"));
        }
        let (port, device) = tokio::io::duplex(4096);
        self.opens.fetch_add(1, Ordering::SeqCst);
        lock(&self.opened).push((path.to_string(), options.clone()));
        lock(&self.devices).insert(path.to_string(), device);
        Ok(port)
    }
}

pub(crate) async fn recv_within<T>(rx: &mut UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}
