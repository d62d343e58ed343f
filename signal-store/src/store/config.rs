//! Store configuration.
//!
//! Every field has a default, so `{}` is a valid config document.

use serde::{Deserialize, Serialize};

use super::error::StoreResult;

/// When listeners hear about writes made by [`Store::batch_update`](super::Store::batch_update).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// Each write notifies immediately, batch or not.
    #[default]
    Immediate,
    /// A batch notifies once per distinct key after all writes, with the final
    /// value, in first-write order.
    Coalesced,
}

/// How async actions treat their `_PENDING`/`_FULFILLED`/`_REJECTED` names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePolicy {
    /// All three names must be registered before the action can start.
    #[default]
    Strict,
    /// Unregistered lifecycle names are skipped.
    Lenient,
}

/// Store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub notify_mode: NotifyMode,
    pub lifecycle_policy: LifecyclePolicy,
}

impl StoreConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_notify_mode(mut self, mode: NotifyMode) -> Self {
        self.notify_mode = mode;
        self
    }

    pub fn with_lifecycle_policy(mut self, policy: LifecyclePolicy) -> Self {
        self.lifecycle_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn empty_document_yields_defaults() {
        let config = StoreConfig::from_json("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.notify_mode, NotifyMode::Immediate);
        assert_eq!(config.lifecycle_policy, LifecyclePolicy::Strict);
    }

    #[test]
    fn parses_snake_case_variants() {
        let config =
            StoreConfig::from_json(r#"{"notify_mode": "coalesced", "lifecycle_policy": "lenient"}"#)
                .unwrap();
        assert_eq!(config.notify_mode, NotifyMode::Coalesced);
        assert_eq!(config.lifecycle_policy, LifecyclePolicy::Lenient);
    }

    #[test]
    fn rejects_unknown_variants() {
        let err = StoreConfig::from_json(r#"{"notify_mode": "sometimes"}"#).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
