//! Error types for the store.

use thiserror::Error;

/// Boxed error raised by user handler code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A state key was read before it was ever written.
    #[error("state key \"{0}\" does not exist")]
    UnknownKey(String),

    /// An action name was registered twice.
    #[error("action \"{0}\" already exists")]
    DuplicateAction(String),

    /// An action was dispatched that has no registered handler.
    #[error("action \"{0}\" does not exist")]
    UnknownAction(String),

    /// A handler failed. The source is the handler's own error.
    #[error("{0}")]
    Handler(#[source] BoxError),

    /// Dispatching one of an async action's lifecycle names failed.
    #[error("lifecycle action \"{action}\" failed: {source}")]
    Lifecycle {
        /// The lifecycle name, e.g. `FETCH_PENDING`.
        action: String,
        /// What went wrong while dispatching it.
        #[source]
        source: Box<StoreError>,
    },

    /// Initial state was not a JSON object.
    #[error("initial state must be a JSON object, got {0}")]
    InvalidState(&'static str),

    /// Store configuration could not be parsed.
    #[error("invalid store config: {0}")]
    Config(#[from] serde_json::Error),
}

impl StoreError {
    /// Wrap an arbitrary handler error.
    pub fn handler<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Handler(error.into())
    }

    /// The handler's own error, if this is a [`StoreError::Handler`].
    pub fn handler_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Handler(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }

    /// Whether this is a lifecycle failure.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Lifecycle { .. })
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("network down")]
    struct NetworkDown;

    #[test]
    fn handler_errors_display_verbatim() {
        let err = StoreError::handler(NetworkDown);
        assert_eq!(err.to_string(), "network down");
        assert!(err.handler_error().is_some_and(|e| e.is::<NetworkDown>()));
    }

    #[test]
    fn string_messages_become_handler_errors() {
        let err = StoreError::handler("boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn lifecycle_errors_name_the_action() {
        let err = StoreError::Lifecycle {
            action: "FETCH_PENDING".to_string(),
            source: Box::new(StoreError::UnknownAction("FETCH_PENDING".to_string())),
        };
        assert!(err.is_lifecycle());
        assert_eq!(
            err.to_string(),
            "lifecycle action \"FETCH_PENDING\" failed: action \"FETCH_PENDING\" does not exist"
        );
    }
}
