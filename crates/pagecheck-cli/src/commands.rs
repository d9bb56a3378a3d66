//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pagecheck: browser acceptance tests for the books.toscrape.com catalog
#[derive(Parser, Debug)]
#[command(name = "pagecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only failures and the summary)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the acceptance suite in Chromium
    Run(RunArgs),

    /// List case names without running them
    List(ListArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Maximum concurrent cases (0 = one per CPU)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Per-case timeout in milliseconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Only run cases whose name matches (regex, or substring if not a valid regex)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Site under test
    #[arg(long, env = "PAGECHECK_BASE_URL")]
    pub base_url: Option<String>,

    /// Auto-wait budget for assertions in milliseconds
    #[arg(long)]
    pub assert_timeout: Option<u64>,

    /// Stop starting new cases after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Report format written to --output (or stdout for json/junit)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Write the report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// YAML config file (flags override it)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Chromium executable
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium: Option<PathBuf>,

    /// Disable the Chromium sandbox
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Only list cases whose name matches
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON outcome list
    Json,
    /// JUnit XML
    Junit,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
            FormatArg::Junit => Self::Junit,
        }
    }
}

/// Color choice argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
