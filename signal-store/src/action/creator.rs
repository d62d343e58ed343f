//! Action descriptors.
//!
//! An [`ActionCreator`] pairs an action name with a payload transform. It holds
//! no store and can be shared between stores.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

type PayloadTransform = dyn Fn(Value) -> Value + Send + Sync;

/// A named action plus its payload, ready to dispatch.
///
/// Serializes as `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// Builds [`ActionEnvelope`]s for one action name.
#[derive(Clone)]
pub struct ActionCreator {
    name: String,
    transform: Arc<PayloadTransform>,
}

impl ActionCreator {
    /// A creator whose payload is the input, unchanged.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_payload(name, |input| input)
    }

    /// A creator that maps raw input to the payload with `transform`.
    pub fn with_payload<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            transform: Arc::new(transform),
        }
    }

    /// The action name, used to register its handler.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create(&self, input: Value) -> ActionEnvelope {
        ActionEnvelope {
            kind: self.name.clone(),
            payload: (self.transform)(input),
        }
    }
}

impl fmt::Debug for ActionCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCreator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Shorthand for [`ActionCreator::new`].
pub fn create_action(name: impl Into<String>) -> ActionCreator {
    ActionCreator::new(name)
}

/// Shorthand for [`ActionCreator::with_payload`].
pub fn create_action_with<F>(name: impl Into<String>, transform: F) -> ActionCreator
where
    F: Fn(Value) -> Value + Send + Sync + 'static,
{
    ActionCreator::with_payload(name, transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_payload_by_default() {
        let add_todo = create_action("ADD_TODO");
        assert_eq!(add_todo.name(), "ADD_TODO");

        let envelope = add_todo.create(json!({"id": 1}));
        assert_eq!(envelope.kind, "ADD_TODO");
        assert_eq!(envelope.payload, json!({"id": 1}));
    }

    #[test]
    fn transform_shapes_payload() {
        let toggle = create_action_with("TOGGLE_TODO", |id| json!({ "id": id }));
        assert_eq!(toggle.create(json!(7)).payload, json!({"id": 7}));
    }

    #[test]
    fn envelope_uses_type_field() {
        let envelope = create_action("INCREMENT_COUNTER").create(Value::Null);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"type": "INCREMENT_COUNTER", "payload": null})
        );

        let parsed: ActionEnvelope = serde_json::from_str(r#"{"type": "RESET"}"#).unwrap();
        assert_eq!(parsed.kind, "RESET");
        assert_eq!(parsed.payload, Value::Null);
    }
}
