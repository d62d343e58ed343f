//! The store: named signals, a registry of action handlers, and listeners.
//!
//! # Writes and notifications
//!
//! Every [`Store::set`] writes the key's signal and then calls every listener
//! with `(key, value)`, synchronously. [`Store::batch_update`] runs its writes
//! inside a reactive batch, so effects observing the store re-run once for the
//! whole batch. Listeners are a separate channel: with the default
//! [`NotifyMode::Immediate`] they still hear about every individual write,
//! even inside a batch. [`NotifyMode::Coalesced`] switches batches to one
//! notification per distinct key, delivered after the last write.
//!
//! # Concurrency
//!
//! `Store` is a cheap handle; clones share state and may be sent across
//! threads. Nothing serializes in-flight async actions against each other.

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use smallvec::SmallVec;

use super::config::{LifecyclePolicy, NotifyMode, StoreConfig};
use super::error::{StoreError, StoreResult};
use super::handler::{ActionHandler, Dispatch, StoreAccess};
use super::listener::{ListenerSet, Unsubscribe};
use crate::action::{ActionEnvelope, AsyncAction};
use crate::reactive::{batch, Memo, Signal};

/// Point-in-time copy of every key and its value, in key creation order.
pub type State = IndexMap<String, Value>;

struct StoreInner {
    config: StoreConfig,
    state: RwLock<IndexMap<String, Signal<Value>>>,
    actions: DashMap<String, ActionHandler>,
    listeners: Arc<ListenerSet>,
}

/// A reactive state container.
///
/// ```rust
/// use signal_store::Store;
/// use serde_json::{json, Value};
///
/// let store = Store::with_state([("counter", json!(0))]);
/// store
///     .add_action("INC", |store, _payload| {
///         let next = store.get("counter")?.as_i64().unwrap_or(0) + 1;
///         store.set("counter", json!(next));
///         Ok(Value::Null)
///     })
///     .unwrap();
///
/// store.dispatch("INC", Value::Null).unwrap();
/// assert_eq!(store.get("counter").unwrap(), json!(1));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// An empty store with the default config.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default(), std::iter::empty::<(String, Value)>())
    }

    /// A store seeded with `initial` and the default config.
    pub fn with_state<I, K>(initial: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::with_config(StoreConfig::default(), initial)
    }

    /// A store seeded with `initial`.
    pub fn with_config<I, K>(config: StoreConfig, initial: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let state = initial
            .into_iter()
            .map(|(key, value)| (key.into(), Signal::new(value)))
            .collect();

        Self {
            inner: Arc::new(StoreInner {
                config,
                state: RwLock::new(state),
                actions: DashMap::new(),
                listeners: Arc::new(ListenerSet::default()),
            }),
        }
    }

    /// A store seeded from a JSON object, one key per member.
    pub fn from_json(initial: Value) -> StoreResult<Self> {
        match initial {
            Value::Object(members) => Ok(Self::with_state(members)),
            Value::Null => Err(StoreError::InvalidState("null")),
            Value::Bool(_) => Err(StoreError::InvalidState("a boolean")),
            Value::Number(_) => Err(StoreError::InvalidState("a number")),
            Value::String(_) => Err(StoreError::InvalidState("a string")),
            Value::Array(_) => Err(StoreError::InvalidState("an array")),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Current value of `key`.
    ///
    /// Read inside a memo or effect, this tracks the key like a signal read.
    pub fn get(&self, key: &str) -> StoreResult<Value> {
        self.get_cell(key).map(|cell| cell.get())
    }

    /// The signal backing `key`, for binding from outside the store.
    ///
    /// Writing the returned signal directly updates derived values but does
    /// not notify store listeners.
    pub fn get_cell(&self, key: &str) -> StoreResult<Signal<Value>> {
        self.inner
            .state
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::UnknownKey(key.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.state.read().contains_key(key)
    }

    /// Write `key`, creating it on first write, then notify every listener.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.write(&key, value.clone());
        self.inner.listeners.notify(&key, &value);
    }

    /// Apply every update inside a reactive batch.
    ///
    /// See the module docs for how listeners are notified.
    pub fn batch_update<I, K>(&self, updates: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        match self.inner.config.notify_mode {
            NotifyMode::Immediate => batch(|| {
                for (key, value) in updates {
                    self.set(key, value);
                }
            }),
            NotifyMode::Coalesced => {
                let mut written: IndexMap<String, Value> = IndexMap::new();
                batch(|| {
                    for (key, value) in updates {
                        let key = key.into();
                        self.write(&key, value.clone());
                        written.insert(key, value);
                    }
                });
                for (key, value) in written {
                    self.inner.listeners.notify(&key, &value);
                }
            }
        }
    }

    fn write(&self, key: &str, value: Value) {
        let mut state = self.inner.state.write();
        if let Some(cell) = state.get(key) {
            let cell = cell.clone();
            // Propagation may run effects that read the store.
            drop(state);
            if !cell.set_if_changed(value) {
                tracing::trace!(key, "state key unchanged");
            }
        } else {
            tracing::trace!(key, "creating state key");
            state.insert(key.to_string(), Signal::new(value));
        }
    }

    /// Register a synchronous handler under `name`.
    pub fn add_action<F>(&self, name: impl Into<String>, handler: F) -> StoreResult<()>
    where
        F: Fn(&dyn StoreAccess, Value) -> StoreResult<Value> + Send + Sync + 'static,
    {
        self.add_handler(name, ActionHandler::sync(handler))
    }

    /// Register an async action under its own name.
    ///
    /// Its lifecycle names are not registered; see [`AsyncAction`].
    pub fn add_async_action(&self, action: &AsyncAction) -> StoreResult<()> {
        self.add_handler(action.name(), action.handler())
    }

    /// Register any handler under `name`. Each name can be registered once.
    pub fn add_handler(&self, name: impl Into<String>, handler: ActionHandler) -> StoreResult<()> {
        match self.inner.actions.entry(name.into()) {
            Entry::Occupied(entry) => Err(StoreError::DuplicateAction(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(action = %entry.key(), is_async = handler.is_async(), "registered action");
                entry.insert(handler);
                Ok(())
            }
        }
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.inner.actions.contains_key(name)
    }

    /// Registered action names, sorted.
    pub fn action_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .actions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Run the handler registered under `name`.
    ///
    /// Synchronous handlers run to completion here and their errors are
    /// returned as-is. Asynchronous handlers start here and finish when the
    /// returned [`Dispatch`] is awaited.
    pub fn dispatch(&self, name: &str, payload: Value) -> StoreResult<Dispatch> {
        let handler = self
            .inner
            .actions
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::UnknownAction(name.to_string()))?;

        tracing::debug!(action = name, "dispatching action");

        match handler {
            ActionHandler::Sync(handler) => {
                handler(self as &dyn StoreAccess, payload).map(Dispatch::Ready)
            }
            ActionHandler::Async(handler) => {
                let store: Arc<dyn StoreAccess> = Arc::new(self.clone());
                handler(store, payload).map(Dispatch::Pending)
            }
        }
    }

    /// Dispatch an envelope built by an [`ActionCreator`](crate::action::ActionCreator).
    pub fn dispatch_action(&self, action: ActionEnvelope) -> StoreResult<Dispatch> {
        self.dispatch(&action.kind, action.payload)
    }

    /// A derived value over `deps`, recomputed when any of them is written.
    ///
    /// `compute` receives the dependency values in the order given. Every key
    /// must already exist.
    pub fn compute<T, F>(&self, deps: &[&str], compute: F) -> StoreResult<Memo<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&[Value]) -> T + Send + Sync + 'static,
    {
        let cells: SmallVec<[Signal<Value>; 4]> = deps
            .iter()
            .map(|key| self.get_cell(key))
            .collect::<StoreResult<_>>()?;

        Ok(Memo::new(move || {
            let values: SmallVec<[Value; 4]> = cells.iter().map(Signal::get).collect();
            compute(&values)
        }))
    }

    /// Call `listener` with `(key, value)` after every write.
    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.inner.listeners.add(Arc::new(listener))
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Snapshot of the whole state. Changing it does not touch the store.
    pub fn get_state(&self) -> State {
        self.inner
            .state
            .read()
            .iter()
            .map(|(key, cell)| (key.clone(), cell.get_untracked()))
            .collect()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.inner.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreAccess for Store {
    fn get(&self, key: &str) -> StoreResult<Value> {
        Store::get(self, key)
    }

    fn set(&self, key: &str, value: Value) {
        Store::set(self, key, value);
    }

    fn dispatch(&self, name: &str, payload: Value) -> StoreResult<Dispatch> {
        Store::dispatch(self, name, payload)
    }

    fn has_action(&self, name: &str) -> bool {
        Store::has_action(self, name)
    }

    fn lifecycle_policy(&self) -> LifecyclePolicy {
        self.inner.config.lifecycle_policy
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("keys", &self.inner.state.read().keys().collect::<Vec<_>>())
            .field("actions", &self.inner.actions.len())
            .field("listeners", &self.inner.listeners)
            .field("config", &self.inner.config)
            .finish()
    }
}
