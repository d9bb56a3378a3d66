//! Pagecheck CLI library
//!
//! Argument parsing, layered configuration, progress output and report
//! writing for the `pagecheck` binary.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod logging;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, FormatArg, ListArgs, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::{env_filter, init_tracing};
pub use output::{render_report, OutputFormat, ProgressReporter};
pub use runner::TestRunner;
