//! Run report: one [`Outcome`] per executed case, in suite order.
//!
//! Renders as a human summary, JSON, or JUnit XML for CI.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::result::{ErrorClass, PagecheckError, PagecheckResult};

/// Terminal status of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeStatus {
    /// Every step succeeded
    Passed,
    /// An assertion did not hold
    Failed,
    /// Infrastructure fault or timeout
    Errored,
}

impl OutcomeStatus {
    /// Status a case ends with when `err` stops it
    #[must_use]
    pub const fn from_error(err: &PagecheckError) -> Self {
        match err.classify() {
            ErrorClass::Assertion => Self::Failed,
            ErrorClass::Infrastructure | ErrorClass::Timeout => Self::Errored,
        }
    }

    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Short label for terminal output
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed => "FAIL",
            Self::Errored => "ERROR",
        }
    }
}

/// Recorded result of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// Case name
    pub name: String,
    /// Terminal status
    pub status: OutcomeStatus,
    /// Failure or error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Wall time from session open to close
    pub duration_ms: u64,
}

impl Outcome {
    /// Passing outcome
    #[must_use]
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: OutcomeStatus::Passed,
            message: None,
            duration_ms: millis(duration),
        }
    }

    /// Outcome for a case stopped by `err`
    #[must_use]
    pub fn from_error(name: impl Into<String>, duration: Duration, err: &PagecheckError) -> Self {
        Self {
            name: name.into(),
            status: OutcomeStatus::from_error(err),
            message: Some(err.to_string()),
            duration_ms: millis(duration),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Outcomes of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Suite name
    pub suite_name: String,
    /// Outcomes in suite declaration order
    pub outcomes: Vec<Outcome>,
    /// Wall time of the whole run
    pub duration_ms: u64,
}

impl Report {
    /// Create a report
    #[must_use]
    pub fn new(suite_name: impl Into<String>, outcomes: Vec<Outcome>, duration: Duration) -> Self {
        Self {
            suite_name: suite_name.into(),
            outcomes,
            duration_ms: millis(duration),
        }
    }

    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Passed count
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(OutcomeStatus::Passed)
    }

    /// Failed count
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    /// Errored count
    #[must_use]
    pub fn errored_count(&self) -> usize {
        self.count(OutcomeStatus::Errored)
    }

    /// Total outcomes
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether every recorded case passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_passed())
    }

    /// Process exit code: 0 iff every case passed
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.all_passed())
    }

    /// Outcomes that did not pass
    #[must_use]
    pub fn failures(&self) -> Vec<&Outcome> {
        self.outcomes
            .iter()
            .filter(|o| !o.status.is_passed())
            .collect()
    }

    /// Status sequence in suite order
    #[must_use]
    pub fn statuses(&self) -> Vec<OutcomeStatus> {
        self.outcomes.iter().map(|o| o.status).collect()
    }

    /// Generate summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {} passed, {} failed, {} errored ({} total) in {:.2}s",
            self.suite_name,
            self.passed_count(),
            self.failed_count(),
            self.errored_count(),
            self.total_count(),
            Duration::from_millis(self.duration_ms).as_secs_f64()
        )
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> PagecheckResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write JSON report
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn write_json(&self, path: &Path) -> PagecheckResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Render JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="{}" tests="{}" failures="{}" errors="{}" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.total_count(),
            self.failed_count(),
            self.errored_count(),
            Duration::from_millis(self.duration_ms).as_secs_f64()
        ));
        xml.push('\n');

        for outcome in &self.outcomes {
            xml.push_str(&format!(
                r#"  <testcase name="{}" time="{:.3}">"#,
                escape_xml(&outcome.name),
                Duration::from_millis(outcome.duration_ms).as_secs_f64()
            ));
            xml.push('\n');

            let tag = match outcome.status {
                OutcomeStatus::Passed => None,
                OutcomeStatus::Failed => Some("failure"),
                OutcomeStatus::Errored => Some("error"),
            };
            if let Some(tag) = tag {
                let message = escape_xml(outcome.message.as_deref().unwrap_or_default());
                xml.push_str(&format!(r#"    <{tag} message="{message}">{message}</{tag}>"#));
                xml.push('\n');
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    /// Write JUnit XML report
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn write_junit(&self, path: &Path) -> PagecheckResult<()> {
        std::fs::write(path, self.render_junit())?;
        Ok(())
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
