//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It owns the dependency index and propagates invalidation when a
//! source changes.
//!
//! # How It Works
//!
//! 1. Memos and effects register with the runtime and get back a
//!    [`ReactiveHandle`]; the registry only holds weak references.
//!
//! 2. When a memo or effect reads a source, the runtime records the edge
//!    `source -> subscriber`.
//!
//! 3. When a source changes, the runtime:
//!    a. Finds all subscribers of the source
//!    b. Marks them as "maybe dirty"
//!    c. Forwards the invalidation through memos that just went stale
//!    d. Schedules effects, or queues them if a batch is open
//!
//! Memos stay lazy: they only recompute on the next read.
//!
//! # Thread Safety
//!
//! The registry and the dependency index are process-wide and guarded by
//! `parking_lot` locks. No lock is held while user code runs.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexSet;
use parking_lot::RwLock;

use super::batch;
use super::subscriber::{SourceId, SubscriberId};

/// A trait for nodes that can be notified when dependencies change.
pub trait Reactive: Send + Sync {
    /// Get the subscriber ID for this reactive value.
    fn subscriber_id(&self) -> SubscriberId;

    /// The source ID under which this node can itself be read, if any.
    ///
    /// Memos return `Some`, effects return `None`.
    fn source_id(&self) -> Option<SourceId>;

    /// Mark this reactive value as potentially needing update.
    ///
    /// Returns `true` if the node went from up-to-date to stale, which is when
    /// its own dependents need to hear about it.
    fn mark_maybe_dirty(&self) -> bool;

    /// Schedule this reactive value for execution (effects only).
    fn schedule(&self);

    /// Check if this reactive value is an effect (eager) or memo (lazy).
    fn is_eager(&self) -> bool;
}

/// Handle to a registered reactive value.
///
/// Dropping this handle unregisters the reactive value from the runtime.
pub struct ReactiveHandle {
    subscriber_id: SubscriberId,
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

/// Both directions of the dependency relation.
#[derive(Default)]
struct DependencyIndex {
    /// source -> subscribers that read it, in registration order
    subscribers: HashMap<SourceId, IndexSet<SubscriberId>>,
    /// subscriber -> sources it read during its last run
    sources: HashMap<SubscriberId, IndexSet<SourceId>>,
}

impl DependencyIndex {
    fn forget_subscriber(&mut self, subscriber_id: SubscriberId) {
        if let Some(sources) = self.sources.remove(&subscriber_id) {
            for source in sources {
                if let Some(subs) = self.subscribers.get_mut(&source) {
                    subs.shift_remove(&subscriber_id);
                    if subs.is_empty() {
                        self.subscribers.remove(&source);
                    }
                }
            }
        }
    }

    fn forget_source(&mut self, source: SourceId) {
        if let Some(subs) = self.subscribers.remove(&source) {
            for sub in subs {
                if let Some(sources) = self.sources.get_mut(&sub) {
                    sources.shift_remove(&source);
                }
            }
        }
    }
}

/// The global reactive runtime.
pub struct Runtime;

static REGISTRY: OnceLock<RwLock<HashMap<SubscriberId, Weak<dyn Reactive>>>> = OnceLock::new();
static DEPENDENCIES: OnceLock<RwLock<DependencyIndex>> = OnceLock::new();

fn get_registry() -> &'static RwLock<HashMap<SubscriberId, Weak<dyn Reactive>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn get_dependencies() -> &'static RwLock<DependencyIndex> {
    DEPENDENCIES.get_or_init(|| RwLock::new(DependencyIndex::default()))
}

impl Runtime {
    /// Register a reactive value with the runtime.
    ///
    /// Returns a handle that unregisters the value when dropped.
    pub fn register(reactive: Arc<dyn Reactive>) -> ReactiveHandle {
        let id = reactive.subscriber_id();

        get_registry().write().insert(id, Arc::downgrade(&reactive));

        ReactiveHandle { subscriber_id: id }
    }

    fn unregister(id: SubscriberId) {
        get_registry().write().remove(&id);
        get_dependencies().write().forget_subscriber(id);
    }

    /// Record that a subscriber depends on a source.
    ///
    /// Called automatically when a source is read within a reactive context.
    pub fn add_dependency(source: SourceId, subscriber_id: SubscriberId) {
        let mut index = get_dependencies().write();
        index
            .subscribers
            .entry(source)
            .or_default()
            .insert(subscriber_id);
        index
            .sources
            .entry(subscriber_id)
            .or_default()
            .insert(source);
    }

    /// Remove all dependencies for a subscriber.
    ///
    /// Called before re-running a computation to clear stale dependencies.
    pub fn clear_dependencies(subscriber_id: SubscriberId) {
        get_dependencies().write().forget_subscriber(subscriber_id);
    }

    /// Drop every edge leaving `source`. Called when a source is dropped.
    pub fn remove_source(source: SourceId) {
        get_dependencies().write().forget_source(source);
    }

    /// Number of subscribers currently depending on `source`.
    pub fn subscriber_count(source: SourceId) -> usize {
        get_dependencies()
            .read()
            .subscribers
            .get(&source)
            .map_or(0, IndexSet::len)
    }

    /// Number of sources `subscriber_id` read during its last run.
    pub fn dependency_count(subscriber_id: SubscriberId) -> usize {
        get_dependencies()
            .read()
            .sources
            .get(&subscriber_id)
            .map_or(0, IndexSet::len)
    }

    /// Notify all subscribers that a source changed.
    ///
    /// This is the core update propagation mechanism.
    pub fn notify_source_change(source: SourceId) {
        let subscriber_ids: Vec<SubscriberId> = {
            let index = get_dependencies().read();
            match index.subscribers.get(&source) {
                Some(subs) => subs.iter().copied().collect(),
                None => return,
            }
        };

        let nodes: Vec<Arc<dyn Reactive>> = {
            let registry = get_registry().read();
            subscriber_ids
                .iter()
                .filter_map(|id| registry.get(id).and_then(Weak::upgrade))
                .collect()
        };

        tracing::trace!(?source, subscribers = nodes.len(), "propagating change");

        let mut effects_to_run = Vec::new();

        for node in nodes {
            let went_stale = node.mark_maybe_dirty();

            // A memo that just went stale invalidates whatever read it.
            if went_stale {
                if let Some(derived) = node.source_id() {
                    Self::notify_source_change(derived);
                }
            }

            if node.is_eager() {
                effects_to_run.push(node);
            }
        }

        for effect in effects_to_run {
            if batch::is_batching() {
                batch::defer(effect);
            } else {
                effect.schedule();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    struct MockReactive {
        id: SubscriberId,
        source: Option<SourceId>,
        dirty: AtomicBool,
        scheduled: AtomicI32,
        eager: bool,
    }

    impl MockReactive {
        fn new(eager: bool) -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                source: None,
                dirty: AtomicBool::new(false),
                scheduled: AtomicI32::new(0),
                eager,
            })
        }

        fn derived() -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                source: Some(SourceId::new()),
                dirty: AtomicBool::new(false),
                scheduled: AtomicI32::new(0),
                eager: false,
            })
        }
    }

    impl Reactive for MockReactive {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn source_id(&self) -> Option<SourceId> {
            self.source
        }

        fn mark_maybe_dirty(&self) -> bool {
            !self.dirty.swap(true, Ordering::SeqCst)
        }

        fn schedule(&self) {
            self.scheduled.fetch_add(1, Ordering::SeqCst);
        }

        fn is_eager(&self) -> bool {
            self.eager
        }
    }

    #[test]
    fn runtime_registers_and_unregisters() {
        let reactive = MockReactive::new(false);
        let id = reactive.id;

        let handle = Runtime::register(reactive);
        assert!(get_registry().read().contains_key(&id));

        drop(handle);
        assert!(!get_registry().read().contains_key(&id));
    }

    #[test]
    fn runtime_notifies_subscribers() {
        let memo = MockReactive::new(false);
        let effect = MockReactive::new(true);
        let source = SourceId::new();

        let _memo_handle = Runtime::register(memo.clone());
        let _effect_handle = Runtime::register(effect.clone());

        Runtime::add_dependency(source, memo.id);
        Runtime::add_dependency(source, effect.id);

        Runtime::notify_source_change(source);

        assert!(memo.dirty.load(Ordering::SeqCst));
        assert!(effect.dirty.load(Ordering::SeqCst));

        // Only the eager node is scheduled
        assert_eq!(memo.scheduled.load(Ordering::SeqCst), 0);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn runtime_forwards_through_stale_memos() {
        let memo = MockReactive::derived();
        let effect = MockReactive::new(true);
        let source = SourceId::new();

        let _memo_handle = Runtime::register(memo.clone());
        let _effect_handle = Runtime::register(effect.clone());

        Runtime::add_dependency(source, memo.id);
        Runtime::add_dependency(memo.source.unwrap(), effect.id);

        Runtime::notify_source_change(source);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);

        // The memo is already stale, so nothing is forwarded the second time.
        Runtime::notify_source_change(source);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn runtime_clears_dependencies() {
        let reactive = MockReactive::new(false);
        let id = reactive.id;
        let source = SourceId::new();

        let _handle = Runtime::register(reactive.clone());

        Runtime::add_dependency(source, id);
        assert_eq!(Runtime::subscriber_count(source), 1);
        assert_eq!(Runtime::dependency_count(id), 1);

        Runtime::clear_dependencies(id);
        assert_eq!(Runtime::subscriber_count(source), 0);
        assert_eq!(Runtime::dependency_count(id), 0);
    }

    #[test]
    fn removed_sources_drop_their_edges() {
        let reactive = MockReactive::new(false);
        let source = SourceId::new();
        let _handle = Runtime::register(reactive.clone());

        Runtime::add_dependency(source, reactive.id);
        Runtime::remove_source(source);

        assert_eq!(Runtime::subscriber_count(source), 0);
        assert_eq!(Runtime::dependency_count(reactive.id), 0);
    }
}
