//! Action descriptors and async action lifecycles.
//!
//! Neither type owns a store. An [`ActionCreator`] only shapes payloads; an
//! [`AsyncAction`] is registered on a store like any other handler and talks
//! to that store through [`StoreAccess`](crate::store::StoreAccess).

mod creator;
mod lifecycle;

pub use creator::{create_action, create_action_with, ActionCreator, ActionEnvelope};
pub use lifecycle::{create_async_action, AsyncAction, LifecyclePhase};
