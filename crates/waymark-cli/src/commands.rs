//! CLI command definitions using clap

use crate::scenarios::Scenario;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use waymark::pages::DEFAULT_BASE_URL;

/// Waymark: run end-to-end browser scenarios with resilient element interaction
#[derive(Parser, Debug)]
#[command(name = "waymark")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against the site
    Run(RunArgs),

    /// Show or validate interaction configuration
    Config(ConfigArgs),

    /// List available scenarios
    Scenarios,
}

/// Scenario selection
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScenarioArg {
    /// Every scenario
    #[default]
    All,
    /// New user registration
    Registration,
    /// Login with a wrong password
    FailedLogin,
    /// Login with real credentials
    SuccessfulLogin,
    /// Office details on the contacts page
    Contacts,
}

impl ScenarioArg {
    /// Scenarios selected by this argument
    #[must_use]
    pub fn scenarios(self) -> Vec<Scenario> {
        match self {
            Self::All => Scenario::all().to_vec(),
            Self::Registration => vec![Scenario::Registration],
            Self::FailedLogin => vec![Scenario::FailedLogin],
            Self::SuccessfulLogin => vec![Scenario::SuccessfulLogin],
            Self::Contacts => vec![Scenario::Contacts],
        }
    }
}

/// Arguments for the run command
#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Scenario to run
    #[arg(short, long, value_enum, default_value = "all")]
    pub scenario: ScenarioArg,

    /// Site under test
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Interaction config file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Pause for an operator when a CAPTCHA blocks the flow
    #[arg(long)]
    pub allow_manual_intervention: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Run chromium without its sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Path to the chromium binary
    #[arg(long)]
    pub chromium_path: Option<String>,

    /// Directory to write one JSON interaction trace per scenario
    #[arg(long)]
    pub trace_out: Option<PathBuf>,

    /// Account email for the login scenarios
    #[arg(long, env = "WAYMARK_LOGIN_EMAIL")]
    pub email: Option<String>,

    /// Account password for the successful-login scenario
    #[arg(long, env = "WAYMARK_LOGIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as YAML
    Show {
        /// Config file to load (defaults are shown without one)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check a configuration file
    Validate {
        /// Config file to check
        path: PathBuf,
    },
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
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
