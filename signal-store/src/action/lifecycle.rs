//! Async actions with pending/fulfilled/rejected notifications.
//!
//! An [`AsyncAction`] named `FETCH` dispatches `FETCH_PENDING` when it starts,
//! then `FETCH_FULFILLED` with the result or `FETCH_REJECTED` with the error
//! message, and hands the handler's outcome back to the caller. No retries.
//!
//! The three lifecycle names are plain actions. Nothing registers them for
//! you. Under [`LifecyclePolicy::Strict`] the action refuses to start unless
//! all three are registered; under [`LifecyclePolicy::Lenient`] missing ones
//! are skipped. A failing lifecycle handler always surfaces as
//! [`StoreError::Lifecycle`], never as a handler error.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::FutureExt;
use serde_json::Value;

use crate::store::{
    ActionHandler, Dispatch, LifecyclePolicy, PendingAction, StoreAccess, StoreError, StoreResult,
};

type AsyncActionFn = dyn Fn(Arc<dyn StoreAccess>, Value) -> PendingAction + Send + Sync;

/// Phase of an async action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    Pending,
    Fulfilled,
    Rejected,
}

impl LifecyclePhase {
    pub const ALL: [LifecyclePhase; 3] = [Self::Pending, Self::Fulfilled, Self::Rejected];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Fulfilled => "FULFILLED",
            Self::Rejected => "REJECTED",
        }
    }

    /// The action name for this phase of `base`, e.g. `FETCH_PENDING`.
    pub fn action_name(self, base: &str) -> String {
        format!("{}_{}", base, self.suffix())
    }
}

/// An asynchronous action wrapped in lifecycle notifications.
#[derive(Clone)]
pub struct AsyncAction {
    name: String,
    handler: Arc<AsyncActionFn>,
}

impl AsyncAction {
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<dyn StoreAccess>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StoreResult<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(
                move |store: Arc<dyn StoreAccess>, payload: Value| -> PendingAction {
                    handler(store, payload).boxed()
                },
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the action dispatched for `phase`.
    pub fn phase_name(&self, phase: LifecyclePhase) -> String {
        phase.action_name(&self.name)
    }

    /// All three lifecycle names, pending first.
    pub fn lifecycle_names(&self) -> [String; 3] {
        LifecyclePhase::ALL.map(|phase| self.phase_name(phase))
    }

    /// Start the action against `store`.
    ///
    /// The pending notification is dispatched before this returns; the
    /// handler and the closing notification run when the future is polled.
    pub fn run(&self, store: Arc<dyn StoreAccess>, payload: Value) -> StoreResult<PendingAction> {
        if store.lifecycle_policy() == LifecyclePolicy::Strict {
            for name in self.lifecycle_names() {
                if !store.has_action(&name) {
                    return Err(StoreError::Lifecycle {
                        source: Box::new(StoreError::UnknownAction(name.clone())),
                        action: name,
                    });
                }
            }
        }

        let pending = notify(&*store, &self.phase_name(LifecyclePhase::Pending), Value::Null)?;

        let fulfilled_name = self.phase_name(LifecyclePhase::Fulfilled);
        let rejected_name = self.phase_name(LifecyclePhase::Rejected);
        let pending_name = self.phase_name(LifecyclePhase::Pending);
        let handler = Arc::clone(&self.handler);
        let name = self.name.clone();

        Ok(async move {
            settle(pending, &pending_name).await?;

            match handler(Arc::clone(&store), payload).await {
                Ok(result) => {
                    let fulfilled = notify(&*store, &fulfilled_name, result.clone())?;
                    settle(fulfilled, &fulfilled_name).await?;
                    Ok::<Value, StoreError>(result)
                }
                Err(error) => {
                    let message = Value::String(error.to_string());
                    let rejected = match notify(&*store, &rejected_name, message) {
                        Ok(dispatch) => settle(dispatch, &rejected_name).await,
                        Err(lifecycle) => Err(lifecycle),
                    };

                    if let Err(lifecycle) = rejected {
                        tracing::error!(
                            action = %name,
                            error = %error,
                            "rejection notification failed, handler error is masked"
                        );
                        return Err(lifecycle);
                    }
                    Err(error)
                }
            }
        }
        .boxed())
    }

    /// A handler that runs this action, for [`Store::add_handler`](crate::Store::add_handler).
    pub fn handler(&self) -> ActionHandler {
        let action = self.clone();
        ActionHandler::starting(move |store, payload| action.run(store, payload))
    }
}

impl fmt::Debug for AsyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Shorthand for [`AsyncAction::new`].
pub fn create_async_action<F, Fut>(name: impl Into<String>, handler: F) -> AsyncAction
where
    F: Fn(Arc<dyn StoreAccess>, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StoreResult<Value>> + Send + 'static,
{
    AsyncAction::new(name, handler)
}

fn lifecycle_error(action: &str, source: StoreError) -> StoreError {
    StoreError::Lifecycle {
        action: action.to_string(),
        source: Box::new(source),
    }
}

/// Dispatch one lifecycle name. `Ok(None)` means it was skipped.
fn notify(store: &dyn StoreAccess, name: &str, payload: Value) -> StoreResult<Option<Dispatch>> {
    if store.lifecycle_policy() == LifecyclePolicy::Lenient && !store.has_action(name) {
        tracing::debug!(action = name, "skipping unregistered lifecycle action");
        return Ok(None);
    }

    store
        .dispatch(name, payload)
        .map(Some)
        .map_err(|source| lifecycle_error(name, source))
}

/// Wait for a lifecycle handler that returned a pending future.
async fn settle(dispatch: Option<Dispatch>, name: &str) -> StoreResult<()> {
    match dispatch {
        Some(dispatch) => dispatch
            .await
            .map(drop)
            .map_err(|source| lifecycle_error(name, source)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_names_derive_from_base() {
        let action = create_async_action("FETCH", |_store, _payload| async { Ok(Value::Null) });
        assert_eq!(
            action.lifecycle_names(),
            [
                "FETCH_PENDING".to_string(),
                "FETCH_FULFILLED".to_string(),
                "FETCH_REJECTED".to_string()
            ]
        );
        assert_eq!(action.name(), "FETCH");
    }

    #[test]
    fn handler_is_async() {
        let action = create_async_action("LOAD", |_store, _payload| async { Ok(Value::Null) });
        assert!(action.handler().is_async());
    }
}
