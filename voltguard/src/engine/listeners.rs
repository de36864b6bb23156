//! Listener registry with disposer handles.
//!
//! Used by the change tracker and the recalculation scheduler. Listeners are
//! called synchronously, in registration order, outside the registry lock.
//! A panicking listener is logged and does not stop delivery to the others.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use super::lock;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct RegistryInner<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// Registry of callbacks for events of type `T`
pub struct ListenerRegistry<T> {
    inner: Arc<Mutex<RegistryInner<T>>>,
}

impl<T: 'static> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener. The returned handle removes it again.
    pub fn add<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<RegistryInner<T>>> = Arc::downgrade(&self.inner);
        ListenerHandle {
            dispose: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner).listeners.retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    /// Deliver an event to every registered listener
    pub fn notify(&self, event: &T) {
        let snapshot: Vec<Listener<T>> = lock(&self.inner)
            .listeners
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::error!(
                    "Listener panicked while handling event; continuing with remaining listeners"
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer for a registered listener.
///
/// Dropping the handle leaves the listener registered; call
/// [`ListenerHandle::unsubscribe`] to remove it.
pub struct ListenerHandle {
    dispose: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerHandle {
    /// Remove the listener. Safe to call after the registry is gone.
    pub fn unsubscribe(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notify_and_unsubscribe() {
        let registry: ListenerRegistry<u32> = ListenerRegistry::new();
        let total = Arc::new(AtomicUsize::new(0));

        let t = total.clone();
        let handle = registry.add(move |v| {
            t.fetch_add(*v as usize, Ordering::SeqCst);
        });
        registry.notify(&3);
        assert_eq!(total.load(Ordering::SeqCst), 3);

        handle.unsubscribe();
        registry.notify(&5);
        assert_eq!(total.load(Ordering::SeqCst), 3);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let registry: ListenerRegistry<()> = ListenerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let _bad = registry.add(|_| panic!("listener failure"));
        let c = calls.clone();
        let _good = registry.add(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify(&());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry: ListenerRegistry<()> = ListenerRegistry::new();
        let handle = registry.add(|_| {});
        drop(registry);
        handle.unsubscribe();
    }
}
