//! Signal Store
//!
//! A small reactive state container. A [`Store`] owns a set of named values,
//! derives read-only values from them, routes every mutation through named
//! actions, and tells listeners about each write.
//!
//! - `reactive`: signals, memos, effects, and batching
//! - `store`: the store, its handler types, listeners, config, and errors
//! - `action`: action descriptors and async action lifecycles
//!
//! # Example
//!
//! ```rust
//! use signal_store::{create_action, Store};
//! use serde_json::{json, Value};
//!
//! let store = Store::with_state([("counter", json!(0))]);
//! let increment = create_action("INCREMENT_COUNTER");
//!
//! store
//!     .add_action(increment.name(), |store, _payload| {
//!         let next = store.get("counter")?.as_i64().unwrap_or(0) + 1;
//!         store.set("counter", json!(next));
//!         Ok(Value::Null)
//!     })
//!     .unwrap();
//!
//! let doubled = store
//!     .compute(&["counter"], |values| values[0].as_i64().unwrap_or(0) * 2)
//!     .unwrap();
//!
//! store.dispatch_action(increment.create(Value::Null)).unwrap();
//! assert_eq!(doubled.get(), 2);
//! ```

pub mod action;
pub mod reactive;
pub mod store;

pub use action::{
    create_action, create_action_with, create_async_action, ActionCreator, ActionEnvelope,
    AsyncAction, LifecyclePhase,
};
pub use reactive::{batch, Effect, Memo, Signal};
pub use store::{
    ActionHandler, Dispatch, LifecyclePolicy, NotifyMode, State, Store, StoreAccess, StoreConfig,
    StoreError, StoreResult, Unsubscribe,
};
