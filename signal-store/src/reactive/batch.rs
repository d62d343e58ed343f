//! Batched updates.
//!
//! Inside a batch, writes still invalidate memos right away (a memo read in
//! the middle of a batch sees the latest values), but effects that would
//! re-run are queued instead. Each queued effect runs once when the outermost
//! batch on the current thread ends.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;

use super::runtime::Reactive;
use super::subscriber::SubscriberId;

#[derive(Default)]
struct BatchState {
    depth: usize,
    queued: IndexMap<SubscriberId, Arc<dyn Reactive>>,
}

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

/// RAII guard for a batch scope.
///
/// Nested guards are allowed; only the outermost one flushes. The guard is
/// tied to the thread that created it.
pub struct BatchGuard {
    _not_send: PhantomData<*const ()>,
}

impl BatchGuard {
    /// Open a batch scope on the current thread.
    pub fn new() -> Self {
        BATCH.with(|state| state.borrow_mut().depth += 1);
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Default for BatchGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let outermost = BATCH.with(|state| {
            let mut state = state.borrow_mut();
            state.depth -= 1;
            state.depth == 0
        });

        if !outermost {
            return;
        }

        if std::thread::panicking() {
            BATCH.with(|state| state.borrow_mut().queued.clear());
            return;
        }

        flush();
    }
}

/// Run `f` inside a batch scope.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _guard = BatchGuard::new();
    f()
}

/// Whether a batch scope is open on the current thread.
pub fn is_batching() -> bool {
    BATCH.with(|state| state.borrow().depth > 0)
}

/// Queue an effect until the current batch ends.
pub(crate) fn defer(effect: Arc<dyn Reactive>) {
    BATCH.with(|state| {
        state
            .borrow_mut()
            .queued
            .entry(effect.subscriber_id())
            .or_insert(effect);
    });
}

fn flush() {
    // Effects may write signals while flushing; those run immediately because
    // the depth is back to zero, so one pass normally drains the queue.
    loop {
        let queued = BATCH.with(|state| std::mem::take(&mut state.borrow_mut().queued));
        if queued.is_empty() {
            break;
        }

        tracing::trace!(effects = queued.len(), "flushing batch");

        for (_, effect) in queued {
            effect.schedule();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::SourceId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        id: SubscriberId,
        runs: AtomicUsize,
    }

    impl Reactive for Probe {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn source_id(&self) -> Option<SourceId> {
            None
        }

        fn mark_maybe_dirty(&self) -> bool {
            true
        }

        fn schedule(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }

        fn is_eager(&self) -> bool {
            true
        }
    }

    fn probe() -> Arc<Probe> {
        Arc::new(Probe {
            id: SubscriberId::new(),
            runs: AtomicUsize::new(0),
        })
    }

    #[test]
    fn deferred_effects_run_once_at_outermost_exit() {
        let effect = probe();

        batch(|| {
            assert!(is_batching());
            defer(effect.clone());
            batch(|| defer(effect.clone()));

            // Inner scope ended but the outer one is still open.
            assert_eq!(effect.runs.load(Ordering::SeqCst), 0);
        });

        assert!(!is_batching());
        assert_eq!(effect.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn batch_returns_closure_value() {
        assert_eq!(batch(|| 7), 7);
    }
}
