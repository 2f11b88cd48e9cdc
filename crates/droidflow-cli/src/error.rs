//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// The suite stopped before every scenario ran
    #[error("Suite aborted: {0}")]
    SuiteAborted(droidflow::DroidflowError),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Droidflow library error
    #[error("Droidflow error: {0}")]
    Droidflow(#[from] droidflow::DroidflowError),

    /// Runtime could not be started
    #[error("Runtime error: {message}")]
    Runtime {
        /// Error message
        message: String,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a runtime error
    #[must_use]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use droidflow::DroidflowError;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("no scenarios match 'xyz'");
        assert!(err.to_string().contains("Invalid argument"));
        assert!(err.to_string().contains("xyz"));
    }

    #[test]
    fn test_suite_aborted_keeps_cause() {
        let err = CliError::SuiteAborted(DroidflowError::DriverAcquisition {
            message: "connection refused".to_string(),
        });
        let text = err.to_string();
        assert!(text.starts_with("Suite aborted"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_droidflow_error_from() {
        let cli_err: CliError = DroidflowError::config("empty server url").into();
        assert!(cli_err.to_string().contains("empty server url"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }
}
