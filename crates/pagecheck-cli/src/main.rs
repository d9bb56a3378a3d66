//! Pagecheck CLI: browser acceptance tests for the books catalog
//!
//! ## Usage
//!
//! ```bash
//! pagecheck run                          # Run all cases headless
//! pagecheck run --filter "US-00[12]"     # Only matching cases
//! pagecheck run --format junit -o r.xml  # JUnit report for CI
//! pagecheck list --filter NEG            # Show case names
//! ```

use clap::Parser;
use pagecheck_cli::{init_tracing, Cli, CliConfig, CliResult, Commands, TestRunner, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    init_tracing(verbosity);

    match cli.command {
        Commands::Run(ref args) => {
            let mut config = match args.config {
                Some(ref path) => CliConfig::from_file(path)?,
                None => CliConfig::new(),
            };
            config = config.with_verbosity(verbosity).with_color(cli.color.into());
            config.apply_run_args(args)?;

            let runtime = tokio::runtime::Runtime::new()?;
            let report = runtime.block_on(TestRunner::new(config).run())?;
            Ok(ExitCode::from(report.exit_code()))
        }
        Commands::List(ref args) => {
            let config = CliConfig {
                filter: args.filter.clone(),
                ..CliConfig::new()
            };
            for name in TestRunner::new(config).list()? {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
