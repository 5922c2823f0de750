//! Waymark CLI library
//!
//! Runs the site's end-to-end scenarios in chromium, one fresh browser per
//! scenario, and reports a pass/fail summary.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
mod logging;
mod output;
mod runner;
pub mod scenarios;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, ConfigCommand, RunArgs, ScenarioArg};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_logging;
pub use output::{scenario_table, ProgressReporter};
#[cfg(feature = "browser")]
pub use runner::ChromiumFactory;
pub use runner::{DriverFactory, RunSummary, ScenarioResult, ScenarioRunner, Verdict};
pub use scenarios::{run_scenario, Credentials, Scenario, ScenarioContext, ScenarioStatus};
