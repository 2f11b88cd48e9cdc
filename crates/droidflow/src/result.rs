//! Result and error types for Droidflow.

use thiserror::Error;

/// W3C error code for an element handle that no longer points at the screen
pub const STALE_ELEMENT: &str = "stale element reference";

/// Result type for Droidflow operations
pub type DroidflowResult<T> = Result<T, DroidflowError>;

/// Errors that can occur while driving a scenario
#[derive(Debug, Error)]
pub enum DroidflowError {
    /// The driver could not locate the target element
    #[error("Element not found ({locator}): {message}")]
    ElementNotFound {
        /// Locator query that failed
        locator: String,
        /// Driver message, kept verbatim
        message: String,
    },

    /// The located element rejected the action
    #[error("Action '{action}' failed on {locator}: {message}")]
    ActionFailed {
        /// Action name (click, type, attribute, ...)
        action: String,
        /// Locator query of the target element
        locator: String,
        /// Driver message, kept verbatim
        message: String,
    },

    /// A readiness wait elapsed without the condition holding
    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the awaited condition
        what: String,
    },

    /// Session negotiation with the automation backend failed
    #[error("Failed to acquire driver session: {message}")]
    DriverAcquisition {
        /// Error message
        message: String,
    },

    /// The backend answered with something outside the wire protocol
    #[error("Protocol error: {message}")]
    Protocol {
        /// Error message
        message: String,
    },

    /// Terminal assertion content did not match
    #[error("Expected: {expected}. Actual: {actual}")]
    AssertionMismatch {
        /// Expected content
        expected: String,
        /// Observed content
        actual: String,
    },

    /// Scenario definition cannot be executed as written
    #[error("Invalid scenario: {message}")]
    InvalidScenario {
        /// Error message
        message: String,
    },

    /// Report persistence failed
    #[error("Failed to write report {path}: {message}")]
    ReportWrite {
        /// Target path
        path: String,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl DroidflowError {
    /// Create an element-not-found error
    #[must_use]
    pub fn not_found(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ElementNotFound {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Create an action-failed error
    #[must_use]
    pub fn action_failed(
        action: impl Into<String>,
        locator: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ActionFailed {
            action: action.into(),
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error means the element was absent
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ElementNotFound { .. } | Self::Timeout { .. })
    }

    /// Whether a located element went away before it could be used
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::ActionFailed { message, .. } if message.starts_with(STALE_ELEMENT))
    }

    /// Whether the error must stop the whole run
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::DriverAcquisition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_keeps_message_verbatim() {
        let err = DroidflowError::not_found("//android.widget.Button", "no such element: xyz");
        let text = err.to_string();
        assert!(text.contains("//android.widget.Button"));
        assert!(text.contains("no such element: xyz"));
        assert!(err.is_not_found());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_assertion_mismatch_format() {
        let err = DroidflowError::AssertionMismatch {
            expected: "Activity Streak".to_string(),
            actual: "Sign in".to_string(),
        };
        assert_eq!(err.to_string(), "Expected: Activity Streak. Actual: Sign in");
    }

    #[test]
    fn test_driver_acquisition_is_fatal() {
        let err = DroidflowError::DriverAcquisition {
            message: "connection refused".to_string(),
        };
        assert!(err.is_fatal());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_timeout_counts_as_absence() {
        let err = DroidflowError::Timeout {
            ms: 500,
            what: "visible //x".to_string(),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("500ms"));
    }

    #[test]
    fn test_stale_detection() {
        let stale = DroidflowError::action_failed(
            "displayed",
            "//x",
            "stale element reference: element is not attached",
        );
        assert!(stale.is_stale());
        assert!(!stale.is_not_found());
        let covered = DroidflowError::action_failed("click", "//x", "element click intercepted");
        assert!(!covered.is_stale());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DroidflowError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
