//! Error types for maps-rx.
//!
//! Context-affinity violations are the only error the bridge itself ever
//! reports. Configuration and script errors belong to the CLI and config
//! layers. Failures raised by a host surface's own install/remove calls are
//! never caught or translated here.

use thiserror::Error;

use crate::config::ConfigError;
use crate::context::ContextId;

/// Errors that can occur while subscribing to or driving a map event stream.
#[derive(Debug, Error)]
pub enum MapsRxError {
    /// A subscription was attempted off the designated main context.
    ///
    /// Surfaced synchronously as the subscriber's terminal error. No native
    /// registration has happened. Resubscribing from the main context works.
    #[error("subscription attempted on {actual}, expected main context {expected}")]
    NotOnMainContext {
        /// The designated main context.
        expected: ContextId,
        /// The context the subscription was attempted from.
        actual: ContextId,
    },
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// A replay script is malformed.
    #[error("Script error: {0}")]
    Script(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MapsRxError {
    /// Returns `true` if this is a [`MapsRxError::NotOnMainContext`] error.
    #[must_use]
    pub const fn is_not_on_main_context(&self) -> bool {
        matches!(self, Self::NotOnMainContext { .. })
    }
}

impl From<serde_json::Error> for MapsRxError {
    fn from(err: serde_json::Error) -> Self { Self::Script(err.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_on_main_context_display_names_both_contexts() {
        let expected = ContextId::fresh();
        let actual = ContextId::fresh();
        let err = MapsRxError::NotOnMainContext { expected, actual };

        let msg = err.to_string();
        assert!(msg.contains(&expected.to_string()));
        assert!(msg.contains(&actual.to_string()));
        assert!(err.is_not_on_main_context());
    }

    #[test]
    fn test_script_error_is_not_context_error() {
        let err = MapsRxError::Script("missing op".to_string());
        assert!(!err.is_not_on_main_context());
        assert_eq!(err.to_string(), "Script error: missing op");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "script.jsonc");
        let err: MapsRxError = io_err.into();
        assert!(matches!(err, MapsRxError::Io(_)));
        assert!(err.to_string().contains("script.jsonc"));
    }

    #[test]
    fn test_json_error_conversion_is_script_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err: MapsRxError = json_err.into();
        assert!(matches!(err, MapsRxError::Script(_)));
    }
}
