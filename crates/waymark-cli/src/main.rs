//! Waymark CLI: end-to-end browser scenarios
//!
//! ## Usage
//!
//! ```bash
//! waymark run                                   # Run every scenario
//! waymark run --scenario contacts --headed      # One scenario, visible browser
//! waymark run --allow-manual-intervention       # Pause for CAPTCHAs
//! waymark config show                           # Print effective config
//! ```

use clap::Parser;
use std::process::ExitCode;
use waymark_cli::{
    handlers::{execute_config, execute_run},
    init_logging, scenario_table, Cli, CliConfig, CliError, CliResult, ColorChoice, Commands,
    Verbosity,
};

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

    // Build configuration from CLI args
    let config = build_config(&cli);
    init_logging(&config);

    match cli.command {
        Commands::Run(args) => {
            let summary = execute_run(&config, &args)?;
            if summary.all_passed() {
                Ok(ExitCode::SUCCESS)
            } else {
                Err(CliError::scenario_failed(format!(
                    "{} of {} scenario(s) failed",
                    summary.failed(),
                    summary.total()
                )))
            }
        }
        Commands::Config(args) => {
            execute_config(&args)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Scenarios => {
            println!("{}", scenario_table());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(ColorChoice::from(cli.color.clone()))
        .with_log_json(cli.log_json)
}
