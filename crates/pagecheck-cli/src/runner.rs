//! Suite execution for the `run` and `list` commands

use pagecheck::{catalog_suite, CaseFilter, Report, Runner, SessionFactory, TestSuite};
use std::sync::Arc;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render_report, OutputFormat, ProgressReporter};

/// Drives the catalog suite with the resolved CLI configuration
#[derive(Debug)]
pub struct TestRunner {
    config: CliConfig,
}

impl TestRunner {
    /// Create a new test runner
    #[must_use]
    pub const fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &CliConfig {
        &self.config
    }

    /// Build the suite for the configured base URL
    pub fn suite(&self) -> CliResult<TestSuite> {
        let suite = catalog_suite(&self.config.base_url)?;
        let dups = suite.duplicate_names();
        if !dups.is_empty() {
            return Err(CliError::config(format!(
                "duplicate case names: {}",
                dups.join(", ")
            )));
        }
        Ok(suite)
    }

    /// Names of the cases the filter selects
    pub fn list(&self) -> CliResult<Vec<String>> {
        let suite = self.suite()?;
        let filter = self.config.filter.as_deref().map(CaseFilter::new);
        Ok(suite
            .select(filter.as_ref())
            .into_iter()
            .map(|case| case.name.clone())
            .collect())
    }

    /// Run `suite` on sessions from `factory` and emit the report
    pub async fn run_with_factory(
        &self,
        suite: &TestSuite,
        factory: Arc<dyn SessionFactory>,
    ) -> CliResult<Report> {
        let runner_config = self.config.runner_config();
        let selected = suite.select(runner_config.filter.as_ref()).len();
        if selected == 0 {
            return Err(CliError::invalid_argument(format!(
                "no case matches filter {:?}",
                self.config.filter.as_deref().unwrap_or_default()
            )));
        }

        let mut reporter = ProgressReporter::new(
            self.config.color.should_color(),
            self.config.verbosity.is_quiet(),
        );
        reporter.info(&format!(
            "{} cases against {} ({} workers)",
            selected, self.config.base_url, runner_config.workers
        ));
        reporter.start_progress(selected as u64, "starting");
        let reporter = Arc::new(reporter);

        let report = Runner::new(runner_config, factory)
            .with_observer(Arc::clone(&reporter) as Arc<dyn pagecheck::RunObserver>)
            .run(suite)
            .await;

        reporter.finish();
        reporter.summary(&report);
        self.emit(&report)?;
        Ok(report)
    }

    /// Launch Chromium, run the catalog suite, and shut the browser down
    #[cfg(feature = "browser")]
    pub async fn run(&self) -> CliResult<Report> {
        let suite = self.suite()?;
        let factory =
            Arc::new(pagecheck::ChromiumFactory::launch(self.config.chromium_config()).await?);
        let result = self
            .run_with_factory(&suite, Arc::clone(&factory) as Arc<dyn SessionFactory>)
            .await;

        match Arc::try_unwrap(factory) {
            Ok(factory) => {
                if let Err(e) = factory.shutdown().await {
                    tracing::warn!(error = %e, "browser shutdown failed");
                }
            }
            Err(_) => tracing::warn!("browser still referenced; not shut down"),
        }
        result
    }

    /// Without the browser feature there is nothing to drive
    #[cfg(not(feature = "browser"))]
    pub async fn run(&self) -> CliResult<Report> {
        Err(CliError::config(
            "built without the `browser` feature; rebuild with --features browser",
        ))
    }

    /// Write the report to `--output`, or to stdout for machine formats
    fn emit(&self, report: &Report) -> CliResult<()> {
        let rendered = render_report(report, self.config.format)?;
        match self.config.output {
            Some(ref path) => {
                std::fs::write(path, rendered).map_err(|e| {
                    CliError::report_generation(format!("{}: {e}", path.display()))
                })?;
                tracing::info!(path = %path.display(), "report written");
            }
            None if self.config.format != OutputFormat::Text => print!("{rendered}"),
            None => {}
        }
        Ok(())
    }
}
