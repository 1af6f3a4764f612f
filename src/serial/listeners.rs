//! Fan-out listener registry.
//!
//! Listeners are kept in registration order and removed by the id carried in
//! their [`ListenerHandle`], so two identical closures stay independent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Listener called once the transport reports the port open.
pub type OpenedListener = dyn Fn() + Send + Sync;

/// Listener called with every chunk of text read from the port.
pub type DataListener = dyn Fn(&str) + Send + Sync;

type ListenerId = u64;

/// Locks a mutex, recovering the data if a listener panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

trait Deregister: Send + Sync {
    fn deregister(&self, id: ListenerId);
}

/// Ordered set of listeners of one kind.
pub(crate) struct Registry<F: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Arc<F>)>>,
}

impl<F: ?Sized> Registry<F> {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }

    fn insert(&self, listener: Arc<F>) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.entries).push((id, listener));
        id
    }

    /// Listeners are called from a snapshot so they may (de)register freely.
    pub(crate) fn snapshot(&self) -> Vec<Arc<F>> {
        lock(&self.entries)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

impl<F: ?Sized + Send + Sync> Deregister for Registry<F> {
    fn deregister(&self, id: ListenerId) {
        lock(&self.entries).retain(|(entry, _)| *entry != id);
    }
}

/// Removes its listener when [`remove`](Self::remove) is called.
///
/// Dropping the handle keeps the listener registered.
#[must_use = "dropping the handle leaves the listener registered forever"]
pub struct ListenerHandle {
    registry: Weak<dyn Deregister>,
    id: ListenerId,
}

impl ListenerHandle {
    pub fn remove(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self.id);
        }
    }
}

/// All listeners attached to a session.
pub struct SessionListeners {
    opened: Arc<Registry<OpenedListener>>,
    data: Arc<Registry<DataListener>>,
}

impl SessionListeners {
    pub fn new() -> Self {
        Self {
            opened: Arc::new(Registry::new()),
            data: Arc::new(Registry::new()),
        }
    }

    pub fn on_opened(&self, handler: impl Fn() + Send + Sync + 'static) -> ListenerHandle {
        let id = self.opened.insert(Arc::new(handler));
        let registry: Arc<dyn Deregister> = self.opened.clone();
        ListenerHandle {
            registry: Arc::downgrade(&registry),
            id,
        }
    }

    pub fn on_data(&self, handler: impl Fn(&str) + Send + Sync + 'static) -> ListenerHandle {
        let id = self.data.insert(Arc::new(handler));
        let registry: Arc<dyn Deregister> = self.data.clone();
        ListenerHandle {
            registry: Arc::downgrade(&registry),
            id,
        }
    }

    pub(crate) fn emit_opened(&self) {
        for listener in self.opened.snapshot() {
            listener();
        }
    }

    pub(crate) fn emit_data(&self, data: &str) {
        for listener in self.data.snapshot() {
            listener(data);
        }
    }

    pub fn opened_count(&self) -> usize {
        self.opened.len()
    }

    pub fn data_count(&self) -> usize {
        self.data.len()
    }
}

impl Default for SessionListeners {
    fn default() -> Self {
        Self::new()
    }
}
