//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use pagecheck::{Outcome, OutcomeStatus, Report, RunObserver};
use serde::{Deserialize, Serialize};

use crate::error::CliResult;

/// Output format for run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
    /// JUnit XML
    Junit,
}

/// Render a report in the given format
pub fn render_report(report: &Report, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Text => {
            let mut text = String::new();
            for outcome in &report.outcomes {
                text.push_str(&format!(
                    "{:<5} {} ({}ms)",
                    outcome.status.label(),
                    outcome.name,
                    outcome.duration_ms
                ));
                if let Some(ref message) = outcome.message {
                    text.push_str(&format!("\n      {message}"));
                }
                text.push('\n');
            }
            text.push_str(&report.summary());
            text.push('\n');
            Ok(text)
        }
        OutputFormat::Json => Ok(report.to_json()?),
        OutputFormat::Junit => Ok(report.render_junit()),
    }
}

/// Live progress for a run; also the runner's [`RunObserver`]
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` cases
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, text: &str) {
        match self.progress_bar {
            Some(ref pb) if !pb.is_finished() => pb.println(text),
            _ => {
                let _ = self.term.write_line(text);
            }
        }
    }

    fn prefix(&self, status: OutcomeStatus) -> String {
        if !self.use_color {
            return status.label().to_string();
        }
        match status {
            OutcomeStatus::Passed => style("✓").green().bold().to_string(),
            OutcomeStatus::Failed => style("✗").red().bold().to_string(),
            OutcomeStatus::Errored => style("!").yellow().bold().to_string(),
        }
    }

    /// Format one finished case
    #[must_use]
    pub fn outcome_line(&self, outcome: &Outcome) -> String {
        let mut line = format!(
            "{} {} ({}ms)",
            self.prefix(outcome.status),
            outcome.name,
            outcome.duration_ms
        );
        if let Some(ref message) = outcome.message {
            let message = if self.use_color {
                style(message).dim().to_string()
            } else {
                message.clone()
            };
            line.push_str(&format!("\n    {message}"));
        }
        line
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        self.line(&format!("{prefix} {message}"));
    }

    /// Print the run summary
    pub fn summary(&self, report: &Report) {
        if self.quiet && report.all_passed() {
            return;
        }

        let _ = self.term.write_line("");
        let secs = std::time::Duration::from_millis(report.duration_ms).as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let errored_style = Style::new().yellow().bold();

            let status = if report.all_passed() {
                passed_style.apply_to("PASSED")
            } else {
                failed_style.apply_to("FAILED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} cases in {:.2}s ({} passed, {} failed, {} errored)",
                status,
                report.total_count(),
                secs,
                passed_style.apply_to(report.passed_count()),
                failed_style.apply_to(report.failed_count()),
                errored_style.apply_to(report.errored_count())
            ));
        } else {
            let status = if report.all_passed() { "PASSED" } else { "FAILED" };
            let _ = self.term.write_line(&format!(
                "{status} {} cases in {secs:.2}s ({} passed, {} failed, {} errored)",
                report.total_count(),
                report.passed_count(),
                report.failed_count(),
                report.errored_count()
            ));
        }
    }
}

impl RunObserver for ProgressReporter {
    fn case_started(&self, name: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(name.to_string());
        }
    }

    fn case_finished(&self, outcome: &Outcome) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
        // Non-passing cases are reported even in quiet mode
        if self.quiet && outcome.status.is_passed() {
            return;
        }
        self.line(&self.outcome_line(outcome));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pagecheck::{AssertionFailure, PagecheckError};
    use std::time::Duration;

    fn report() -> Report {
        let failure = PagecheckError::Assertion(AssertionFailure::new(
            ".product_pod",
            "count == 20",
            "19",
        ));
        Report::new(
            "books-to-scrape",
            vec![
                Outcome::passed("US-001-AC01", Duration::from_millis(40)),
                Outcome::from_error("US-001-AC02", Duration::from_millis(60), &failure),
            ],
            Duration::from_millis(100),
        )
    }

    mod output_format_tests {
        use super::*;

        #[test]
        fn test_default_format() {
            assert_eq!(OutputFormat::default(), OutputFormat::Text);
        }

        #[test]
        fn test_format_deserializes_lowercase() {
            let format: OutputFormat = serde_yaml_ng::from_str("junit").unwrap();
            assert_eq!(format, OutputFormat::Junit);
        }

        #[test]
        fn test_render_text() {
            let text = render_report(&report(), OutputFormat::Text).unwrap();
            assert!(text.contains("PASS  US-001-AC01"));
            assert!(text.contains("FAIL  US-001-AC02"));
            assert!(text.contains("count == 20"));
            assert!(text.contains("1 passed, 1 failed, 0 errored"));
        }

        #[test]
        fn test_render_json() {
            let json = render_report(&report(), OutputFormat::Json).unwrap();
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["outcomes"][1]["status"], "Failed");
            assert_eq!(value["outcomes"][0]["durationMs"], 40);
        }

        #[test]
        fn test_render_junit() {
            let xml = render_report(&report(), OutputFormat::Junit).unwrap();
            assert!(xml.contains("<testsuite"));
            assert!(xml.contains("<failure"));
        }
    }

    mod progress_reporter_tests {
        use super::*;

        #[test]
        fn test_new_reporter() {
            let reporter = ProgressReporter::new(true, false);
            assert!(reporter.use_color);
            assert!(!reporter.quiet);
        }

        #[test]
        fn test_outcome_line_plain() {
            let reporter = ProgressReporter::new(false, false);
            let report = report();
            let line = reporter.outcome_line(&report.outcomes[1]);
            assert!(line.starts_with("FAIL US-001-AC02 (60ms)"));
            assert!(line.contains("expected count == 20"));
        }

        #[test]
        fn test_outcome_line_passed_has_no_message() {
            let reporter = ProgressReporter::new(false, false);
            let report = report();
            assert_eq!(
                reporter.outcome_line(&report.outcomes[0]),
                "PASS US-001-AC01 (40ms)"
            );
        }

        #[test]
        fn test_observer_with_progress() {
            let mut reporter = ProgressReporter::new(false, false);
            reporter.start_progress(2, "running");
            let report = report();
            for outcome in &report.outcomes {
                reporter.case_started(&outcome.name);
                reporter.case_finished(outcome);
            }
            reporter.finish();
            reporter.summary(&report);
        }

        #[test]
        fn test_quiet_mode_has_no_progress_bar() {
            let mut reporter = ProgressReporter::new(false, true);
            reporter.start_progress(2, "running");
            assert!(reporter.progress_bar.is_none());
            reporter.info("hidden");
            reporter.summary(&report());
        }
    }
}
