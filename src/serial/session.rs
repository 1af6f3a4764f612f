//! A single serial connection.
//!
//! Opening spawns one tokio task that owns the stream. The task reads the
//! port and forwards `opened` / data events to the listeners, and serves
//! write and close commands from an unbounded queue.

use log::{debug, error, info, warn};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use tokio::io::{self, AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

use super::listeners::{ListenerHandle, SessionListeners, lock};
use super::options::SerialOptions;
use super::transport::Transport;
use crate::error::{Result, SessionError};

/// Port choice that means "no connection".
pub const NOT_CONNECTED: &str = "Not connected";

const READ_BUFFER_SIZE: usize = 1024;

/// Called once a close has completed.
pub type CloseCallback = Box<dyn FnOnce() + Send>;

/// serial session state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Closed,
    Opening,
    Open,
    Closing,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Closed => write!(f, "closed"),
            State::Opening => write!(f, "opening"),
            State::Open => write!(f, "open"),
            State::Closing => write!(f, "closing"),
        }
    }
}

/// Whether `path` names a real port rather than the empty or "Not connected"
/// choice.
pub fn is_valid_path(path: &str) -> bool {
    !path.is_empty() && path != NOT_CONNECTED
}

enum Command {
    Write(String),
    Close,
}

struct Inner {
    state: State,
    commands: Option<mpsc::UnboundedSender<Command>>,
    close_waiters: Vec<CloseCallback>,
    /// Thread currently delivering an event to the listeners.
    emitter: Option<ThreadId>,
}

struct Shared {
    path: String,
    options: SerialOptions,
    listeners: Arc<SessionListeners>,
    inner: Mutex<Inner>,
    emit_done: Condvar,
}

/// Clears `Inner::emitter` when an emit returns or unwinds.
struct Emitting<'a>(&'a Shared);

impl Drop for Emitting<'_> {
    fn drop(&mut self) {
        lock(&self.0.inner).emitter = None;
        self.0.emit_done.notify_all();
    }
}

impl Shared {
    /// Moves `Opening` to `Open`. Fails if a close arrived meanwhile.
    fn mark_open(&self) -> bool {
        let mut inner = lock(&self.inner);
        if inner.state == State::Opening {
            inner.state = State::Open;
            true
        } else {
            false
        }
    }

    fn is_open(&self) -> bool {
        lock(&self.inner).state == State::Open
    }

    /// Runs `emit` only if the session is open. A close requested from
    /// another thread meanwhile waits until `emit` returns, so no event starts
    /// after a close. Listeners may close the session themselves.
    fn emit_while_open(&self, emit: impl FnOnce()) {
        {
            let mut inner = lock(&self.inner);
            if inner.state != State::Open {
                return;
            }
            inner.emitter = Some(thread::current().id());
        }
        let _emitting = Emitting(self);
        emit();
    }

    fn finish_close(&self) {
        let waiters = {
            let mut inner = lock(&self.inner);
            inner.state = State::Closed;
            inner.commands = None;
            std::mem::take(&mut inner.close_waiters)
        };
        info!("Closed: '{}'", self.path);
        for waiter in waiters {
            waiter();
        }
    }
}

/// Handle to one serial session. Clones refer to the same connection.
#[derive(Clone)]
pub struct SerialSession {
    shared: Arc<Shared>,
}

impl SerialSession {
    /// Creates a closed session for `path`.
    pub fn new(path: impl Into<String>, options: SerialOptions) -> Result<Self> {
        Self::with_listeners(path, options, Arc::new(SessionListeners::new()))
    }

    /// Creates a closed session that reports to an existing listener set.
    pub fn with_listeners(
        path: impl Into<String>,
        options: SerialOptions,
        listeners: Arc<SessionListeners>,
    ) -> Result<Self> {
        let path = path.into();
        if !is_valid_path(&path) {
            return Err(SessionError::InvalidPath(path));
        }
        Ok(Self {
            shared: Arc::new(Shared {
                path,
                options,
                listeners,
                inner: Mutex::new(Inner {
                    state: State::Closed,
                    commands: None,
                    close_waiters: Vec::new(),
                    emitter: None,
                }),
                emit_done: Condvar::new(),
            }),
        })
    }

    /// Begins opening the port. Must be called from within a tokio runtime.
    ///
    /// Transport failures are logged and leave the session closed. Only an
    /// attempt to open a session that is not closed returns an error.
    pub fn open<T: Transport>(&self, transport: Arc<T>) -> Result<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut inner = lock(&self.shared.inner);
            if inner.state != State::Closed {
                return Err(SessionError::AlreadyOpen(self.shared.path.clone()));
            }
            inner.state = State::Opening;
            inner.commands = Some(tx);
        }

        info!(
            "Opening: '{}' with options: {}",
            self.shared.path, self.shared.options
        );
        tokio::spawn(run(transport, Arc::clone(&self.shared), rx));
        Ok(())
    }

    pub fn on_opened(&self, handler: impl Fn() + Send + Sync + 'static) -> ListenerHandle {
        self.shared.listeners.on_opened(handler)
    }

    pub fn on_data(&self, handler: impl Fn(&str) + Send + Sync + 'static) -> ListenerHandle {
        self.shared.listeners.on_data(handler)
    }

    /// Queues `data` for the port and returns `true` straight away.
    ///
    /// Writes made while opening are sent once the port is open. Writes on a
    /// closed session and transport write failures are only logged.
    pub fn write(&self, data: &str) -> bool {
        let inner = lock(&self.shared.inner);
        let sent = match (&inner.state, &inner.commands) {
            (State::Opening | State::Open, Some(commands)) => {
                commands.send(Command::Write(data.to_string())).is_ok()
            }
            _ => false,
        };
        if !sent {
            error!(
                "{}",
                SessionError::port_write(
                    &self.shared.path,
                    format!("session is {}", inner.state)
                )
            );
        }
        true
    }

    /// Requests a close. `callback` runs once the port is closed, or right
    /// away if it already is.
    ///
    /// If another thread is delivering an event, this blocks until its
    /// listeners return.
    pub fn close(&self, callback: Option<CloseCallback>) {
        let current = thread::current().id();
        let mut inner = lock(&self.shared.inner);
        while inner.emitter.is_some_and(|emitter| emitter != current) {
            inner = self
                .shared
                .emit_done
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let state = inner.state;
        match state {
            State::Closed => {
                drop(inner);
                if let Some(callback) = callback {
                    callback();
                }
            }
            State::Closing => {
                inner.close_waiters.extend(callback);
            }
            State::Opening | State::Open => {
                info!("Closing: '{}'", self.shared.path);
                inner.state = State::Closing;
                inner.close_waiters.extend(callback);
                if let Some(commands) = &inner.commands {
                    let _ = commands.send(Command::Close);
                }
            }
        }
    }

    /// Closes the session and waits for the close to complete.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        self.close(Some(Box::new(move || {
            let _ = tx.send(());
        })));
        let _ = rx.await;
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    pub fn state(&self) -> State {
        lock(&self.shared.inner).state
    }

    pub fn current_path(&self) -> &str {
        &self.shared.path
    }

    pub fn options(&self) -> &SerialOptions {
        &self.shared.options
    }
}

impl fmt::Debug for SerialSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialSession")
            .field("path", &self.shared.path)
            .field("options", &self.shared.options)
            .field("state", &self.state())
            .finish()
    }
}

async fn run<T: Transport>(
    transport: Arc<T>,
    shared: Arc<Shared>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let stream = match transport.open(&shared.path, &shared.options) {
        Ok(stream) => stream,
        Err(e) => {
            error!("{e}");
            shared.finish_close();
            return;
        }
    };
    if !shared.mark_open() {
        debug!("'{}' was closed before it finished opening", shared.path);
        drop(stream);
        shared.finish_close();
        return;
    }
    info!("Opened: '{}'", shared.path);
    shared.emit_while_open(|| shared.listeners.emit_opened());

    let (mut reader, mut writer) = io::split(stream);
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    loop {
        tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(Command::Write(data)) => {
                    debug!("'{}' tx {}", shared.path, hex::encode(data.as_bytes()));
                    let result = match writer.write_all(data.as_bytes()).await {
                        Ok(()) => writer.flush().await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = result {
                        error!("{}", SessionError::port_write(&shared.path, e.to_string()));
                    }
                }
                Some(Command::Close) | None => break,
            },
            read = reader.read(&mut buffer) => match read {
                Ok(0) => {
                    warn!("'{}' reached end of stream", shared.path);
                    break;
                }
                Ok(n) => {
                    debug!("'{}' rx {}", shared.path, hex::encode(&buffer[..n]));
                    let text = String::from_utf8_lossy(&buffer[..n]);
                    shared.emit_while_open(|| shared.listeners.emit_data(&text));
                }
                Err(e) => {
                    error!("Failed to read from serial port '{}': {e}", shared.path);
                    break;
                }
            },
        }
    }

    drop(reader);
    drop(writer);
    shared.finish_close();
}
