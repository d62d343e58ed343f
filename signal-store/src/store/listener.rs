//! Store listeners.
//!
//! Listeners are called with `(key, value)` after every write. No ordering is
//! promised between different listeners.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

/// A change listener.
pub type Listener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Registration identity. Subscribing the same closure twice gives two ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerSet {
    next_id: AtomicU64,
    entries: RwLock<IndexMap<ListenerId, Listener>>,
}

impl ListenerSet {
    pub(crate) fn add(self: &Arc<Self>, listener: Listener) -> Unsubscribe {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().insert(id, listener);

        Unsubscribe {
            id,
            set: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: ListenerId) -> bool {
        self.entries.write().shift_remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub(crate) fn notify(&self, key: &str, value: &Value) {
        // Snapshot first so listeners can subscribe or unsubscribe re-entrantly.
        let listeners: Vec<Listener> = self.entries.read().values().cloned().collect();

        tracing::trace!(key, listeners = listeners.len(), "notifying listeners");

        for listener in listeners {
            listener(key, value);
        }
    }
}

/// Handle returned by [`Store::subscribe`](super::Store::subscribe).
///
/// Dropping the handle leaves the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Unsubscribe {
    id: ListenerId,
    set: Weak<ListenerSet>,
}

impl Unsubscribe {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.set.upgrade().is_some_and(|set| set.remove(self.id))
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(counter: &Arc<AtomicUsize>) -> Listener {
        let counter = counter.clone();
        Arc::new(move |_key: &str, _value: &Value| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn same_listener_twice_is_two_registrations() {
        let set = Arc::new(ListenerSet::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let listener = counting(&calls);

        let first = set.add(listener.clone());
        let second = set.add(listener);
        assert_ne!(first.id(), second.id());

        set.notify("k", &Value::Null);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(first.unsubscribe());
        set.notify("k", &Value::Null);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        assert!(second.unsubscribe());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn unsubscribe_after_set_dropped_is_noop() {
        let set = Arc::new(ListenerSet::default());
        let handle = set.add(Arc::new(|_: &str, _: &Value| {}));
        drop(set);
        assert!(!handle.unsubscribe());
    }
}
