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

    /// Report generation error
    #[error("Report generation failed: {message}")]
    ReportGeneration {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("Config file error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Harness error
    #[error("{0}")]
    Pagecheck(#[from] pagecheck::PagecheckError),
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

    /// Create a report generation error
    #[must_use]
    pub fn report_generation(message: impl Into<String>) -> Self {
        Self::ReportGeneration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("workers must be positive");
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_invalid_argument() {
        let err = CliError::invalid_argument("--workers 0");
        assert!(err.to_string().starts_with("Invalid argument"));
    }

    #[test]
    fn test_report_generation() {
        let err = CliError::report_generation("disk full");
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_from_io() {
        let err: CliError = std::io::Error::new(std::io::ErrorKind::NotFound, "nope").into();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn test_from_pagecheck_keeps_message() {
        let err: CliError = pagecheck::PagecheckError::BrowserNotFound.into();
        assert!(err.to_string().contains("Browser not found"));
    }

    #[test]
    fn test_from_yaml() {
        let parsed: Result<u32, _> = serde_yaml_ng::from_str("not: [a number");
        let err: CliError = parsed.unwrap_err().into();
        assert!(err.to_string().contains("Config file"));
    }
}
