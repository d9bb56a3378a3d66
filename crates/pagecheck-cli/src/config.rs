//! CLI configuration
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! command-line flags.

use pagecheck::{PollConfig, RunnerConfig, DEFAULT_BASE_URL, DEFAULT_CASE_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::commands::RunArgs;
use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - failures and summary only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Derive verbosity from `-q` and the `-v` count
    #[must_use]
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Check if debug mode
    #[must_use]
    pub const fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }

    /// Default `tracing` filter directive for this level
    #[must_use]
    pub const fn log_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "pagecheck=info,pagecheck_cli=info,warn",
            Self::Debug => "pagecheck=debug,pagecheck_cli=debug,info",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct CliConfig {
    /// Verbosity level (flags only)
    #[serde(skip)]
    pub verbosity: Verbosity,
    /// Color output choice (flags only)
    #[serde(skip)]
    pub color: ColorChoice,
    /// Concurrent cases (0 = one per CPU)
    pub workers: usize,
    /// Per-case budget in milliseconds
    pub case_timeout_ms: u64,
    /// Assertion auto-wait budget in milliseconds
    pub assert_timeout_ms: u64,
    /// Site under test
    pub base_url: String,
    /// Case name filter
    pub filter: Option<String>,
    /// Stop starting cases after the first non-pass
    pub fail_fast: bool,
    /// Report format
    pub format: OutputFormat,
    /// Report destination
    pub output: Option<PathBuf>,
    /// Run without a browser window
    pub headless: bool,
    /// Chromium executable
    pub chromium_path: Option<PathBuf>,
    /// Keep the Chromium sandbox
    pub sandbox: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        let poll = PollConfig::default();
        Self {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
            workers: pagecheck::DEFAULT_WORKERS,
            case_timeout_ms: DEFAULT_CASE_TIMEOUT_MS,
            assert_timeout_ms: poll.timeout_ms(),
            base_url: DEFAULT_BASE_URL.to_string(),
            filter: None,
            fail_fast: false,
            format: OutputFormat::Text,
            output: None,
            headless: true,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a YAML config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_yaml_ng::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Override file or default values with the flags that were given
    pub fn apply_run_args(&mut self, args: &RunArgs) -> CliResult<()> {
        if let Some(workers) = args.workers {
            self.workers = workers;
        }
        if let Some(ms) = args.timeout {
            self.case_timeout_ms = ms;
        }
        if let Some(ms) = args.assert_timeout {
            self.assert_timeout_ms = ms;
        }
        if let Some(ref url) = args.base_url {
            self.base_url.clone_from(url);
        }
        if args.filter.is_some() {
            self.filter.clone_from(&args.filter);
        }
        if let Some(format) = args.format {
            self.format = format.into();
        }
        if args.output.is_some() {
            self.output.clone_from(&args.output);
        }
        if args.chromium.is_some() {
            self.chromium_path.clone_from(&args.chromium);
        }
        self.fail_fast |= args.fail_fast;
        if args.headed {
            self.headless = false;
        }
        if args.no_sandbox {
            self.sandbox = false;
        }
        self.validate()
    }

    fn validate(&self) -> CliResult<()> {
        if self.case_timeout_ms == 0 {
            return Err(CliError::invalid_argument("case timeout must be positive"));
        }
        if self.assert_timeout_ms > self.case_timeout_ms {
            return Err(CliError::invalid_argument(format!(
                "assert timeout ({}ms) exceeds case timeout ({}ms)",
                self.assert_timeout_ms, self.case_timeout_ms
            )));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(CliError::config(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Get effective number of concurrent cases
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        } else {
            self.workers
        }
    }

    /// Library runner settings
    #[must_use]
    pub fn runner_config(&self) -> RunnerConfig {
        let mut config = RunnerConfig::new()
            .with_workers(self.effective_workers())
            .with_case_timeout(Duration::from_millis(self.case_timeout_ms))
            .with_poll(PollConfig::new(Duration::from_millis(self.assert_timeout_ms)))
            .with_fail_fast(self.fail_fast);
        if let Some(ref filter) = self.filter {
            config = config.with_filter(filter);
        }
        config
    }

    /// Browser launch settings
    #[cfg(feature = "browser")]
    #[must_use]
    pub fn chromium_config(&self) -> pagecheck::ChromiumConfig {
        let mut config = pagecheck::ChromiumConfig::default()
            .with_headless(self.headless)
            .with_navigation_timeout(Duration::from_millis(self.case_timeout_ms));
        if !self.sandbox {
            config = config.with_no_sandbox();
        }
        if let Some(ref path) = self.chromium_path {
            config = config.with_chromium_path(path.to_string_lossy());
        }
        config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_default_verbosity() {
            assert_eq!(Verbosity::default(), Verbosity::Normal);
        }

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(3, false), Verbosity::Debug);
            assert_eq!(Verbosity::from_flags(2, true), Verbosity::Quiet);
        }

        #[test]
        fn test_predicates() {
            assert!(Verbosity::Quiet.is_quiet());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Debug.is_verbose());
            assert!(Verbosity::Debug.is_debug());
            assert!(!Verbosity::Verbose.is_debug());
        }

        #[test]
        fn test_log_directive() {
            assert_eq!(Verbosity::Normal.log_directive(), "warn");
            assert!(Verbosity::Debug.log_directive().contains("pagecheck=debug"));
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_explicit_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod cli_config_tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_defaults() {
            let config = CliConfig::new();
            assert_eq!(config.workers, pagecheck::DEFAULT_WORKERS);
            assert_eq!(config.case_timeout_ms, DEFAULT_CASE_TIMEOUT_MS);
            assert_eq!(config.assert_timeout_ms, 5000);
            assert_eq!(config.base_url, DEFAULT_BASE_URL);
            assert!(config.headless);
            assert!(config.sandbox);
        }

        #[test]
        fn test_flags_override_defaults() {
            let mut config = CliConfig::new();
            let args = RunArgs {
                workers: Some(2),
                timeout: Some(10_000),
                filter: Some("US-001".to_string()),
                headed: true,
                no_sandbox: true,
                fail_fast: true,
                ..RunArgs::default()
            };
            config.apply_run_args(&args).unwrap();
            assert_eq!(config.workers, 2);
            assert_eq!(config.case_timeout_ms, 10_000);
            assert_eq!(config.filter.as_deref(), Some("US-001"));
            assert!(!config.headless);
            assert!(!config.sandbox);
            assert!(config.fail_fast);
        }

        #[test]
        fn test_absent_flags_keep_file_values() {
            let mut config = CliConfig {
                workers: 8,
                filter: Some("NEG".to_string()),
                ..CliConfig::default()
            };
            config.apply_run_args(&RunArgs::default()).unwrap();
            assert_eq!(config.workers, 8);
            assert_eq!(config.filter.as_deref(), Some("NEG"));
        }

        #[test]
        fn test_zero_timeout_rejected() {
            let mut config = CliConfig::new();
            let args = RunArgs {
                timeout: Some(0),
                ..RunArgs::default()
            };
            assert!(matches!(
                config.apply_run_args(&args),
                Err(CliError::InvalidArgument { .. })
            ));
        }

        #[test]
        fn test_assert_timeout_above_case_timeout_rejected() {
            let mut config = CliConfig::new();
            let args = RunArgs {
                timeout: Some(1000),
                assert_timeout: Some(2000),
                ..RunArgs::default()
            };
            assert!(config.apply_run_args(&args).is_err());
        }

        #[test]
        fn test_non_http_base_url_rejected() {
            let mut config = CliConfig::new();
            let args = RunArgs {
                base_url: Some("file:///tmp/site".to_string()),
                ..RunArgs::default()
            };
            assert!(matches!(
                config.apply_run_args(&args),
                Err(CliError::Config { .. })
            ));
        }

        #[test]
        fn test_effective_workers() {
            let config = CliConfig {
                workers: 3,
                ..CliConfig::default()
            };
            assert_eq!(config.effective_workers(), 3);
            let auto = CliConfig {
                workers: 0,
                ..CliConfig::default()
            };
            assert!(auto.effective_workers() >= 1);
        }

        #[test]
        fn test_runner_config() {
            let config = CliConfig {
                workers: 2,
                case_timeout_ms: 9000,
                assert_timeout_ms: 1500,
                filter: Some("US-00[12]".to_string()),
                fail_fast: true,
                ..CliConfig::default()
            };
            let runner = config.runner_config();
            assert_eq!(runner.workers, 2);
            assert_eq!(runner.case_timeout, Duration::from_millis(9000));
            assert_eq!(runner.poll.timeout, Duration::from_millis(1500));
            assert!(runner.fail_fast);
            assert!(runner.filter.is_some());
        }

        #[test]
        fn test_from_file_partial() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "workers: 6\nbase_url: http://localhost:8080/\nformat: junit").unwrap();
            let config = CliConfig::from_file(file.path()).unwrap();
            assert_eq!(config.workers, 6);
            assert_eq!(config.base_url, "http://localhost:8080/");
            assert_eq!(config.format, OutputFormat::Junit);
            assert_eq!(config.case_timeout_ms, DEFAULT_CASE_TIMEOUT_MS);
        }

        #[test]
        fn test_from_file_unknown_key() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "wrokers: 6").unwrap();
            assert!(matches!(
                CliConfig::from_file(file.path()),
                Err(CliError::Yaml(_))
            ));
        }

        #[test]
        fn test_from_file_missing() {
            let err = CliConfig::from_file(Path::new("/nonexistent/pagecheck.yaml")).unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
        }

        #[cfg(feature = "browser")]
        #[test]
        fn test_chromium_config() {
            let config = CliConfig {
                headless: false,
                sandbox: false,
                chromium_path: Some(PathBuf::from("/usr/bin/chromium")),
                ..CliConfig::default()
            };
            let chromium = config.chromium_config();
            assert!(!chromium.headless);
            assert!(!chromium.sandbox);
            assert_eq!(chromium.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        }
    }
}
