//! Result and error types for pagecheck.
//!
//! Errors fall into three families. An [`AssertionFailure`] is a behavioral
//! result and ends a case as `Failed`. Infrastructure faults (navigation,
//! selector resolution, interactability, browser plumbing) and timeouts end a
//! case as `Errored`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for pagecheck operations
pub type PagecheckResult<T> = Result<T, PagecheckError>;

/// Structured description of an expectation that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionFailure {
    /// What the assertion wanted
    pub expected: String,
    /// What the page actually showed
    pub actual: String,
    /// Locator (or `page`) the assertion was evaluated against
    pub locator: String,
}

impl AssertionFailure {
    /// Create a new assertion failure
    #[must_use]
    pub fn new(
        locator: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            expected: expected.into(),
            actual: actual.into(),
            locator: locator.into(),
        }
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.locator, self.expected, self.actual
        )
    }
}

/// What a failure means for the case that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected condition not met
    Assertion,
    /// Harness or environment fault
    Infrastructure,
    /// Polling or case budget exceeded
    Timeout,
}

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum PagecheckError {
    /// An assertion did not hold
    #[error("Assertion failed: {0}")]
    Assertion(AssertionFailure),

    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Session could not be opened, queried or closed
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Navigation error (non-2xx status, unreachable host, aborted load)
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Element exists but cannot be clicked
    #[error("Element {locator} is not interactable: {reason}")]
    ElementNotInteractable {
        /// Locator description
        locator: String,
        /// Why the element was rejected
        reason: String,
    },

    /// Selector matched nothing where one element was required
    #[error("Selector {locator} did not resolve to any element")]
    SelectorResolution {
        /// Locator description
        locator: String,
    },

    /// Selector could not be parsed or evaluated
    #[error("Invalid selector {selector}: {message}")]
    InvalidSelector {
        /// Raw selector
        selector: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms: {what}")]
    Timeout {
        /// What was being waited for
        what: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// A captured variable was read before it was written
    #[error("Variable '{name}' was never captured")]
    MissingCapture {
        /// Variable name
        name: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PagecheckError {
    /// Create a session error
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create a navigation error
    #[must_use]
    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(what: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            ms,
        }
    }

    /// Classify the error for outcome bookkeeping
    #[must_use]
    pub const fn classify(&self) -> ErrorClass {
        match self {
            Self::Assertion(_) => ErrorClass::Assertion,
            Self::Timeout { .. } => ErrorClass::Timeout,
            _ => ErrorClass::Infrastructure,
        }
    }

    /// Whether this error ends a case as `Failed` rather than `Errored`
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion(_))
    }
}

impl From<AssertionFailure> for PagecheckError {
    fn from(failure: AssertionFailure) -> Self {
        Self::Assertion(failure)
    }
}
