use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use indexmap::IndexMap;
use tracing::error;

/// Callback invoked after every session mutation.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`ListenerRegistry::add`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Ordered list of session observers.
///
/// Cloning the registry yields another handle to the same list, so a listener
/// can capture a clone and unsubscribe itself (or others) while being notified.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    listeners: Mutex<IndexMap<ListenerId, Listener>>,
}

impl ListenerRegistry {
    /// Build an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; listeners are notified in registration order.
    pub fn add<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, Arc::new(listener));
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.lock().shift_remove(&id).is_some()
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener registered at the time of the call.
    ///
    /// The list is copied before iterating and the lock is released while the
    /// callbacks run. A panicking listener is logged and skipped.
    pub fn notify(&self) {
        let snapshot: Vec<(ListenerId, Listener)> = self
            .lock()
            .iter()
            .map(|(id, listener)| (*id, listener.clone()))
            .collect();

        for (id, listener) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                error!(listener = id.0, "session listener panicked; continuing");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<ListenerId, Listener>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
