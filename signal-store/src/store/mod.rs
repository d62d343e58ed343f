//! The reactive store.
//!
//! A [`Store`] owns one [`Signal`](crate::reactive::Signal) per state key, a
//! registry of named action handlers, and a set of change listeners.

mod config;
mod error;
mod handler;
mod listener;
#[allow(clippy::module_inception)]
mod store;

pub use config::{LifecyclePolicy, NotifyMode, StoreConfig};
pub use error::{BoxError, StoreError, StoreResult};
pub use handler::{ActionHandler, Dispatch, PendingAction, StoreAccess};
pub use listener::{Listener, ListenerId, Unsubscribe};
pub use store::{State, Store};
