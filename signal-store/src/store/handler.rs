//! Action handlers and the store capability they receive.
//!
//! Handlers never capture the store implicitly. A synchronous handler gets a
//! `&dyn StoreAccess` for the duration of the call; an asynchronous one gets
//! an `Arc<dyn StoreAccess>` it can move into its future. Anything that
//! implements [`StoreAccess`] can drive a handler, which is how handlers are
//! unit-tested without a live [`Store`](super::Store).

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use serde_json::Value;

use super::config::LifecyclePolicy;
use super::error::StoreResult;

/// Future returned by an asynchronous handler.
pub type PendingAction = BoxFuture<'static, StoreResult<Value>>;

type SyncHandlerFn = dyn Fn(&dyn StoreAccess, Value) -> StoreResult<Value> + Send + Sync;
type AsyncHandlerFn =
    dyn Fn(Arc<dyn StoreAccess>, Value) -> StoreResult<PendingAction> + Send + Sync;

/// The operations a handler may perform on the store it runs against.
pub trait StoreAccess: Send + Sync {
    /// Current value of `key`.
    fn get(&self, key: &str) -> StoreResult<Value>;

    /// Write `key`, creating it if needed, and notify listeners.
    fn set(&self, key: &str, value: Value);

    /// Dispatch another action.
    fn dispatch(&self, name: &str, payload: Value) -> StoreResult<Dispatch>;

    /// Whether a handler is registered under `name`.
    fn has_action(&self, name: &str) -> bool;

    /// How async actions treat unregistered lifecycle names.
    fn lifecycle_policy(&self) -> LifecyclePolicy {
        LifecyclePolicy::Strict
    }
}

/// A registered action handler.
#[derive(Clone)]
pub enum ActionHandler {
    /// Runs to completion inside `dispatch`.
    Sync(Arc<SyncHandlerFn>),
    /// Starts inside `dispatch` and finishes when the returned future is polled.
    ///
    /// The synchronous part may fail, in which case `dispatch` itself fails.
    Async(Arc<AsyncHandlerFn>),
}

impl ActionHandler {
    /// Wrap a synchronous handler.
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(&dyn StoreAccess, Value) -> StoreResult<Value> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(handler))
    }

    /// Wrap an `async` handler with no synchronous prefix.
    pub fn future<F, Fut>(handler: F) -> Self
    where
        F: Fn(Arc<dyn StoreAccess>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StoreResult<Value>> + Send + 'static,
    {
        Self::Async(Arc::new(
            move |store: Arc<dyn StoreAccess>, payload: Value| -> StoreResult<PendingAction> {
                Ok(handler(store, payload).boxed())
            },
        ))
    }

    /// Wrap an asynchronous handler whose start-up may fail synchronously.
    pub fn starting<F>(handler: F) -> Self
    where
        F: Fn(Arc<dyn StoreAccess>, Value) -> StoreResult<PendingAction> + Send + Sync + 'static,
    {
        Self::Async(Arc::new(handler))
    }

    /// Whether dispatching this handler yields a pending future.
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("ActionHandler::Sync"),
            Self::Async(_) => f.write_str("ActionHandler::Async"),
        }
    }
}

/// Outcome of a successful `dispatch`.
///
/// Synchronous handlers produce `Ready`; asynchronous ones produce `Pending`.
/// Either can be awaited:
///
/// ```rust
/// # use signal_store::{Store, StoreResult};
/// # use serde_json::{json, Value};
/// # async fn demo() -> StoreResult<()> {
/// let store = Store::new();
/// store.add_action("PING", |_store, _payload| Ok(json!("pong")))?;
/// let reply = store.dispatch("PING", Value::Null)?.await?;
/// assert_eq!(reply, json!("pong"));
/// # Ok(())
/// # }
/// ```
pub enum Dispatch {
    Ready(Value),
    Pending(PendingAction),
}

impl Dispatch {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The handler's result if it already completed.
    pub fn into_ready(self) -> Option<Value> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }
}

impl IntoFuture for Dispatch {
    type Output = StoreResult<Value>;
    type IntoFuture = PendingAction;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Ready(value) => future::ready(Ok(value)).boxed(),
            Self::Pending(pending) => pending,
        }
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}
